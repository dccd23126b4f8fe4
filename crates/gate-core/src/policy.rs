use crate::codes::{DecisionCode, DecisionCoded};
use crate::ids::{Command, MetricIndex, Role, StateId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("{entity} document is malformed: {source}")]
    Malformed {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{entity} is invalid: {reason}")]
    Invalid {
        entity: &'static str,
        reason: String,
    },
    #[error("trusted key `{key_ref}` is not a usable ed25519 public key: {reason}")]
    InvalidKey { key_ref: String, reason: String },
    #[error("weight profile {version} is degenerate: {reason}")]
    DegenerateWeights { version: String, reason: String },
}

impl PolicyError {
    pub(crate) fn invalid(entity: &'static str, reason: impl Into<String>) -> Self {
        PolicyError::Invalid {
            entity,
            reason: reason.into(),
        }
    }
}

impl DecisionCoded for PolicyError {
    fn code(&self) -> DecisionCode {
        match self {
            PolicyError::DegenerateWeights { .. } => DecisionCode::DegenerateWeights,
            _ => DecisionCode::PolicySchemaInvalid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRule {
    pub allowed_commands: BTreeSet<Command>,
    pub next_states: BTreeSet<StateId>,
}

/// Protocol graph for one epoch. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolSpec {
    pub version: String,
    pub states: BTreeMap<StateId, StateRule>,
}

impl ProtocolSpec {
    pub const ENTITY: &'static str = "ProtocolSpec";

    pub fn rule(&self, state: &StateId) -> Option<&StateRule> {
        self.states.get(state)
    }

    pub fn is_defined(&self, state: &StateId) -> bool {
        self.states.contains_key(state)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.states.is_empty() {
            return Err(PolicyError::invalid(Self::ENTITY, "no states declared"));
        }
        for (state, rule) in &self.states {
            if let Some(dangling) = rule.next_states.iter().find(|s| !self.is_defined(s)) {
                return Err(PolicyError::invalid(
                    Self::ENTITY,
                    format!("state `{state}` points at undeclared state `{dangling}`"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationModel {
    pub version: String,
    pub required_roles: BTreeSet<Role>,
    pub minimum_signature_threshold: u32,
    pub exempt_transitions: BTreeSet<(StateId, StateId)>,
}

impl AuthorizationModel {
    pub const ENTITY: &'static str = "AuthorizationModel";

    pub fn is_exempt(&self, from: &StateId, to: &StateId) -> bool {
        // Tuple lookup without cloning both ids.
        self.exempt_transitions
            .iter()
            .any(|(f, t)| f == from && t == to)
    }

    pub fn validate(&self, protocol: &ProtocolSpec) -> Result<(), PolicyError> {
        if self.minimum_signature_threshold as usize > self.required_roles.len() {
            return Err(PolicyError::invalid(
                Self::ENTITY,
                format!(
                    "threshold {} exceeds the {} required roles and can never be met",
                    self.minimum_signature_threshold,
                    self.required_roles.len()
                ),
            ));
        }
        for (from, to) in &self.exempt_transitions {
            if !protocol.is_defined(from) || !protocol.is_defined(to) {
                return Err(PolicyError::invalid(
                    Self::ENTITY,
                    format!("exempt transition `{from}` -> `{to}` names an undeclared state"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTolerance {
    pub max_abs_delta: f64,
    pub alert_ratio: f64,
    pub critical_ratio: f64,
}

impl MetricTolerance {
    pub fn critical_bound(&self) -> f64 {
        self.critical_ratio * self.max_abs_delta
    }

    pub fn alert_bound(&self) -> f64 {
        self.alert_ratio * self.max_abs_delta
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToleranceProfile {
    pub version: String,
    pub metrics: BTreeMap<MetricIndex, MetricTolerance>,
}

impl ToleranceProfile {
    pub const ENTITY: &'static str = "ToleranceProfile";

    pub fn get(&self, metric: &MetricIndex) -> Option<&MetricTolerance> {
        self.metrics.get(metric)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        for (metric, tol) in &self.metrics {
            let finite = tol.max_abs_delta.is_finite()
                && tol.alert_ratio.is_finite()
                && tol.critical_ratio.is_finite();
            if !finite {
                return Err(PolicyError::invalid(
                    Self::ENTITY,
                    format!("metric `{metric}` has a non-finite bound"),
                ));
            }
            if tol.max_abs_delta < 0.0 {
                return Err(PolicyError::invalid(
                    Self::ENTITY,
                    format!("metric `{metric}` has negative maxAbsDelta"),
                ));
            }
            if !(1.0 <= tol.alert_ratio && tol.alert_ratio <= tol.critical_ratio) {
                return Err(PolicyError::invalid(
                    Self::ENTITY,
                    format!(
                        "metric `{metric}` needs 1 <= alertRatio ({}) <= criticalRatio ({})",
                        tol.alert_ratio, tol.critical_ratio
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub version: String,
    pub w_goal: f64,
    pub w_resource: f64,
    pub w_resilience: f64,
}

impl WeightProfile {
    pub const ENTITY: &'static str = "WeightProfile";

    pub fn total(&self) -> f64 {
        self.w_goal + self.w_resource + self.w_resilience
    }

    fn degenerate(&self, reason: impl Into<String>) -> PolicyError {
        PolicyError::DegenerateWeights {
            version: self.version.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        for (name, w) in [
            ("w_goal", self.w_goal),
            ("w_resource", self.w_resource),
            ("w_resilience", self.w_resilience),
        ] {
            if !w.is_finite() || w < 0.0 {
                return Err(self.degenerate(format!(
                    "{name} must be finite and non-negative, got {w}"
                )));
            }
        }
        if self.total() <= 0.0 {
            return Err(self.degenerate("weights sum to zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatePolicy {
    pub minimum_utility_threshold: f64,
    pub allow_soft_drift: bool,
}

impl GatePolicy {
    pub const ENTITY: &'static str = "GatePolicy";

    pub fn validate(&self) -> Result<(), PolicyError> {
        let t = self.minimum_utility_threshold;
        if !t.is_finite() || !(0.0..=1.0).contains(&t) {
            return Err(PolicyError::invalid(
                Self::ENTITY,
                format!("minimumUtilityThreshold must lie in [0, 1], got {t}"),
            ));
        }
        Ok(())
    }
}
