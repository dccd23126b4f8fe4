pub mod audit;
pub mod collaborators;
pub mod gate;
pub mod logging;
pub mod result;
#[cfg(test)]
mod tests;

pub use audit::{AuditRecord, CapturedInputs, ReplayError};
pub use collaborators::{
    EfficacySource, EntropySource, GateService, GoalHitSource, IndependentSources, LedgerReader,
    ResourceEfficiencySource, TelemetryReader,
};
pub use gate::{DecisionGate, IntegrityInputs};
pub use logging::LogFormat;
pub use result::{DecisionComponents, DecisionResult, TamRecord};

pub use efficacy_guards::EfficacyInputs;
pub use gate_core::{EpochStore, PolicyEpoch};
pub use transition_guards::TransitionRequest;
