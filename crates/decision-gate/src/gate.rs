//! The decision gate.
//!
//! Stages run cheapest first: transition authorization, then integrity and
//! drift, then utility. A stage's inputs are only fetched once every
//! earlier stage has passed, and the first failing stage decides the code.

use crate::result::{DecisionComponents, DecisionResult, TamRecord};
use efficacy_guards::EfficacyInputs;
use gate_core::{
    CommittedStateVector, DecisionCode, DecisionCoded, EpochStore, PolicyEpoch,
    RuntimeMetricVector,
};
use integrity_guards::DriftStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use transition_guards::TransitionRequest;

/// Committed and runtime vectors for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityInputs {
    pub committed: CommittedStateVector,
    pub runtime: RuntimeMetricVector,
}

/// Evaluator bound to one epoch snapshot. Cheap to clone and share.
#[derive(Debug, Clone)]
pub struct DecisionGate {
    epoch: Arc<PolicyEpoch>,
}

struct Outcome {
    components: DecisionComponents,
    warnings: Vec<DecisionCode>,
}

impl DecisionGate {
    pub fn new(epoch: Arc<PolicyEpoch>) -> Self {
        Self { epoch }
    }

    /// Binds to whatever epoch `store` holds right now.
    pub fn from_store(store: &EpochStore) -> Self {
        Self::new(store.current())
    }

    pub fn epoch(&self) -> &PolicyEpoch {
        &self.epoch
    }

    /// Evaluates a request whose inputs are already resolved.
    pub fn evaluate(
        &self,
        request: &TransitionRequest,
        committed: &CommittedStateVector,
        runtime: &RuntimeMetricVector,
        efficacy: &EfficacyInputs,
    ) -> DecisionResult {
        self.evaluate_staged(
            request,
            || {
                Ok(IntegrityInputs {
                    committed: committed.clone(),
                    runtime: runtime.clone(),
                })
            },
            || Ok(*efficacy),
        )
    }

    /// Evaluates a request, calling each fetcher only when its stage is
    /// reached. Fetch failures are reported, never retried: a missing vector
    /// is `INTEGRITY_VIOLATION`, a missing score `INVALID_VECTOR_SCORE`.
    pub fn evaluate_staged<V, E>(
        &self,
        request: &TransitionRequest,
        fetch_vectors: V,
        fetch_efficacy: E,
    ) -> DecisionResult
    where
        V: FnOnce() -> anyhow::Result<IntegrityInputs>,
        E: FnOnce() -> anyhow::Result<EfficacyInputs>,
    {
        let result = self.run(request, fetch_vectors, fetch_efficacy);
        log_decision(request, &result);
        result
    }

    fn run<V, E>(
        &self,
        request: &TransitionRequest,
        fetch_vectors: V,
        fetch_efficacy: E,
    ) -> DecisionResult
    where
        V: FnOnce() -> anyhow::Result<IntegrityInputs>,
        E: FnOnce() -> anyhow::Result<EfficacyInputs>,
    {
        let epoch = &*self.epoch;
        let mut out = Outcome {
            components: DecisionComponents::default(),
            warnings: Vec::new(),
        };

        let grant = match transition_guards::validate(
            request,
            epoch.protocol(),
            epoch.authorization(),
        ) {
            Ok(grant) => grant,
            Err(err) => {
                out.components.tam = Some(TamRecord {
                    code: err.code(),
                    role_matches: err.role_matches(),
                });
                return self.reject(err.code(), err.to_string(), out);
            }
        };
        out.components.tam = Some(TamRecord {
            code: grant.code,
            role_matches: Some(grant.role_matches),
        });

        let vectors = match fetch_vectors() {
            Ok(vectors) => vectors,
            Err(err) => {
                return self.reject(
                    DecisionCode::IntegrityViolation,
                    format!("state vectors unavailable: {err:#}"),
                    out,
                );
            }
        };
        let report = match integrity_guards::evaluate(
            &vectors.committed,
            &vectors.runtime,
            epoch.tolerance(),
            epoch.trusted_keys(),
        ) {
            Ok(report) => report,
            Err(err) => return self.reject(err.code(), err.to_string(), out),
        };
        let status = report.status;
        let flagged = report.variance_vector.len();
        out.components.vie = Some(report);
        match status {
            DriftStatus::Nominal => {}
            DriftStatus::Anomaly => {
                return self.reject(
                    DecisionCode::AnomalyBlock,
                    format!("{flagged} metric(s) out of tolerance, at least one past critical"),
                    out,
                );
            }
            DriftStatus::Drift if !epoch.gate().allow_soft_drift => {
                return self.reject(
                    DecisionCode::DriftWarning,
                    format!("{flagged} metric(s) drifting and this epoch does not allow soft drift"),
                    out,
                );
            }
            DriftStatus::Drift => out.warnings.push(DecisionCode::DriftWarning),
        }

        let inputs = match fetch_efficacy() {
            Ok(inputs) => inputs,
            Err(err) => {
                return self.reject(
                    DecisionCode::InvalidVectorScore,
                    format!("efficacy scores unavailable: {err:#}"),
                    out,
                );
            }
        };
        let score = match inputs.score(epoch.weights()) {
            Ok(score) => score,
            Err(err) => return self.reject(err.code(), err.to_string(), out),
        };
        let value = score.value;
        out.components.esc = Some(score);

        let threshold = epoch.gate().minimum_utility_threshold;
        if value < threshold {
            return self.reject(
                DecisionCode::InsufficientUtility,
                format!("utility {value} is below the minimum of {threshold}"),
                out,
            );
        }

        DecisionResult::admit(
            grant.code,
            format!("admitted with utility {value}"),
            epoch.stamp(),
            out.components,
            out.warnings,
        )
    }

    fn reject(&self, code: DecisionCode, reason: String, out: Outcome) -> DecisionResult {
        DecisionResult::reject(code, reason, self.epoch.stamp(), out.components, out.warnings)
    }
}

fn log_decision(request: &TransitionRequest, result: &DecisionResult) {
    let to = request.target.as_ref().map(|t| t.as_str()).unwrap_or("-");
    if result.admissible {
        info!(
            epoch = result.epoch.epoch_id,
            code = %result.code,
            current = %request.current,
            to,
            command = %request.command,
            warnings = result.warnings.len(),
            "transition admitted"
        );
    } else if result.is_blocking() {
        error!(
            epoch = result.epoch.epoch_id,
            code = %result.code,
            current = %request.current,
            to,
            command = %request.command,
            reason = %result.reason,
            "transition blocked"
        );
    } else {
        warn!(
            epoch = result.epoch.epoch_id,
            code = %result.code,
            current = %request.current,
            to,
            command = %request.command,
            reason = %result.reason,
            "transition rejected"
        );
    }
}
