pub mod classify;
pub mod engine;
pub mod report;
pub mod signature;

pub use classify::classify_delta;
pub use engine::{evaluate, IntegrityError};
pub use report::{DeltaReport, DriftStatus, HashPair, UnmatchedMetric, UnmatchedSide, VarianceEntry};
pub use signature::{verify_committed_vector, verify_payload, SignatureFault};
