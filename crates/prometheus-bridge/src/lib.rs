mod guards;
mod metrics;

pub use guards::escalate_if_integrity_compromised;
pub use metrics::{encode_text, GateMetrics};
