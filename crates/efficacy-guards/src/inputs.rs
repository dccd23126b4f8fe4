use crate::scorer::{check_unit_interval, EfficacyComponent, EfficacyError};
use serde::{Deserialize, Serialize};

/// The three upstream scores, already resolved by the orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficacyInputs {
    #[serde(with = "gate_core::float_wire::lossless")]
    pub goal_hit: f64,
    #[serde(with = "gate_core::float_wire::lossless")]
    pub resource_efficiency: f64,
    #[serde(with = "gate_core::float_wire::lossless")]
    pub resilience: f64,
}

impl EfficacyInputs {
    pub fn new(goal_hit: f64, resource_efficiency: f64, resilience: f64) -> Self {
        Self {
            goal_hit,
            resource_efficiency,
            resilience,
        }
    }

    /// The stability auditor reports entropy; resilience is its complement.
    pub fn from_upstream(
        goal_hit: f64,
        resource_efficiency: f64,
        entropy: f64,
    ) -> Result<Self, EfficacyError> {
        Ok(Self::new(
            goal_hit,
            resource_efficiency,
            resilience_from_entropy(entropy)?,
        ))
    }
}

pub fn resilience_from_entropy(entropy: f64) -> Result<f64, EfficacyError> {
    check_unit_interval(EfficacyComponent::Entropy, entropy)?;
    Ok(1.0 - entropy)
}
