pub mod inputs;
pub mod scorer;

pub use inputs::{resilience_from_entropy, EfficacyInputs};
pub use scorer::{score, ComponentContribution, EfficacyComponent, EfficacyError, EfficacyScore, ScoreBreakdown};
