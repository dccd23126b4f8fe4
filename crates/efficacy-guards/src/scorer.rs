use crate::inputs::EfficacyInputs;
use gate_core::{DecisionCode, DecisionCoded, WeightProfile};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EfficacyComponent {
    GoalHit,
    ResourceEfficiency,
    Resilience,
    /// Upstream input from which resilience is derived.
    Entropy,
}

impl fmt::Display for EfficacyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EfficacyComponent::GoalHit => "goal-hit",
            EfficacyComponent::ResourceEfficiency => "resource-efficiency",
            EfficacyComponent::Resilience => "resilience",
            EfficacyComponent::Entropy => "entropy",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EfficacyError {
    #[error("{component} score {value} is outside [0, 1]")]
    InvalidVectorScore {
        component: EfficacyComponent,
        value: f64,
    },
    #[error("weight for {component} must be finite and non-negative, got {weight}")]
    InvalidWeight {
        component: EfficacyComponent,
        weight: f64,
    },
    #[error("weights sum to zero; score cannot be normalized")]
    DegenerateWeights,
}

impl DecisionCoded for EfficacyError {
    fn code(&self) -> DecisionCode {
        match self {
            EfficacyError::InvalidVectorScore { .. } => DecisionCode::InvalidVectorScore,
            EfficacyError::InvalidWeight { .. } | EfficacyError::DegenerateWeights => {
                DecisionCode::DegenerateWeights
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentContribution {
    pub component: EfficacyComponent,
    #[serde(with = "gate_core::float_wire::lossless")]
    pub score: f64,
    pub weight: f64,
    pub normalized_weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub components: Vec<ComponentContribution>,
    pub weight_total: f64,
    pub weights_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficacyScore {
    #[serde(with = "gate_core::float_wire::lossless")]
    pub value: f64,
    pub breakdown: ScoreBreakdown,
}

impl EfficacyScore {
    pub fn meets(&self, threshold: f64) -> bool {
        self.value >= threshold
    }
}

impl EfficacyInputs {
    pub fn score(&self, weights: &WeightProfile) -> Result<EfficacyScore, EfficacyError> {
        score(self.goal_hit, self.resource_efficiency, self.resilience, weights)
    }
}

pub(crate) fn check_unit_interval(
    component: EfficacyComponent,
    value: f64,
) -> Result<(), EfficacyError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EfficacyError::InvalidVectorScore { component, value })
    }
}

/// `Σ(V_i · W_i) / Σ(W_i)` over goal, resource and resilience, in that
/// order. Inputs outside `[0, 1]` are rejected, never clamped.
pub fn score(
    goal_hit: f64,
    resource_efficiency: f64,
    resilience: f64,
    weights: &WeightProfile,
) -> Result<EfficacyScore, EfficacyError> {
    let terms = [
        (EfficacyComponent::GoalHit, goal_hit, weights.w_goal),
        (
            EfficacyComponent::ResourceEfficiency,
            resource_efficiency,
            weights.w_resource,
        ),
        (EfficacyComponent::Resilience, resilience, weights.w_resilience),
    ];

    for (component, value, _) in terms {
        check_unit_interval(component, value)?;
    }
    for (component, _, weight) in terms {
        if !weight.is_finite() || weight < 0.0 {
            return Err(EfficacyError::InvalidWeight { component, weight });
        }
    }

    let weight_total: f64 = terms.iter().map(|(_, _, w)| w).sum();
    if weight_total == 0.0 {
        return Err(EfficacyError::DegenerateWeights);
    }

    let weighted: f64 = terms.iter().map(|(_, v, w)| v * w).sum();
    // A quotient of in-range terms can land one ulp outside [0, 1].
    let value = (weighted / weight_total).clamp(0.0, 1.0);

    let components = terms
        .iter()
        .map(|&(component, score, weight)| ComponentContribution {
            component,
            score,
            weight,
            normalized_weight: weight / weight_total,
            contribution: score * weight / weight_total,
        })
        .collect();

    Ok(EfficacyScore {
        value,
        breakdown: ScoreBreakdown {
            components,
            weight_total,
            weights_version: weights.version.clone(),
        },
    })
}
