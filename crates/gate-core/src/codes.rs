use serde::{Deserialize, Serialize};
use std::fmt;

/// Every outcome the gate can report. Nothing leaves the core without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionCode {
    Success,
    AuthExempt,
    StateUndefined,
    CommandDisallowed,
    TransitionInvalid,
    AuthInsufficient,
    IntegrityViolation,
    AnomalyBlock,
    DriftWarning,
    InsufficientUtility,
    InvalidVectorScore,
    DegenerateWeights,
    PolicySchemaInvalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultClass {
    None,
    Structural,
    Authorization,
    Integrity,
    Drift,
    Utility,
    Configuration,
}

impl DecisionCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            DecisionCode::Success => "SUCCESS",
            DecisionCode::AuthExempt => "AUTH_EXEMPT",
            DecisionCode::StateUndefined => "STATE_UNDEFINED",
            DecisionCode::CommandDisallowed => "COMMAND_DISALLOWED",
            DecisionCode::TransitionInvalid => "TRANSITION_INVALID",
            DecisionCode::AuthInsufficient => "AUTH_INSUFFICIENT",
            DecisionCode::IntegrityViolation => "INTEGRITY_VIOLATION",
            DecisionCode::AnomalyBlock => "ANOMALY_BLOCK",
            DecisionCode::DriftWarning => "DRIFT_WARNING",
            DecisionCode::InsufficientUtility => "INSUFFICIENT_UTILITY",
            DecisionCode::InvalidVectorScore => "INVALID_VECTOR_SCORE",
            DecisionCode::DegenerateWeights => "DEGENERATE_WEIGHTS",
            DecisionCode::PolicySchemaInvalid => "POLICY_SCHEMA_INVALID",
        }
    }

    pub const fn fault_class(self) -> FaultClass {
        match self {
            DecisionCode::Success | DecisionCode::AuthExempt => FaultClass::None,
            DecisionCode::StateUndefined
            | DecisionCode::CommandDisallowed
            | DecisionCode::TransitionInvalid => FaultClass::Structural,
            DecisionCode::AuthInsufficient => FaultClass::Authorization,
            DecisionCode::IntegrityViolation => FaultClass::Integrity,
            DecisionCode::AnomalyBlock | DecisionCode::DriftWarning => FaultClass::Drift,
            DecisionCode::InsufficientUtility => FaultClass::Utility,
            DecisionCode::InvalidVectorScore
            | DecisionCode::DegenerateWeights
            | DecisionCode::PolicySchemaInvalid => FaultClass::Configuration,
        }
    }

    pub const fn is_pass(self) -> bool {
        matches!(self, DecisionCode::Success | DecisionCode::AuthExempt)
    }

    /// Whether the caller can get a different answer by changing the request
    /// (more credentials, corrected input, reconciled runtime) rather than
    /// by an operator fixing policy or investigating tampering.
    pub const fn is_recoverable(self) -> bool {
        match self.fault_class() {
            FaultClass::None
            | FaultClass::Structural
            | FaultClass::Authorization
            | FaultClass::Utility => true,
            FaultClass::Drift => matches!(self, DecisionCode::DriftWarning),
            FaultClass::Integrity | FaultClass::Configuration => false,
        }
    }

    pub const fn is_configuration_fault(self) -> bool {
        matches!(self.fault_class(), FaultClass::Configuration)
    }
}

impl fmt::Display for DecisionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a component error onto the shared taxonomy.
pub trait DecisionCoded {
    fn code(&self) -> DecisionCode;
}
