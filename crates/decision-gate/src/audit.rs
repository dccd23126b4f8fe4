use crate::gate::{DecisionGate, IntegrityInputs};
use crate::result::DecisionResult;
use efficacy_guards::EfficacyInputs;
use gate_core::EpochStamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use transition_guards::TransitionRequest;

/// Inputs the gate actually consumed. Stages that never ran leave `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedInputs {
    pub vectors: Option<IntegrityInputs>,
    pub vector_fetch_error: Option<String>,
    pub efficacy: Option<EfficacyInputs>,
    pub efficacy_fetch_error: Option<String>,
}

impl CapturedInputs {
    pub fn resolved(vectors: IntegrityInputs, efficacy: EfficacyInputs) -> Self {
        Self {
            vectors: Some(vectors),
            efficacy: Some(efficacy),
            ..Self::default()
        }
    }

    fn replay_vectors(&self) -> anyhow::Result<IntegrityInputs> {
        match (&self.vectors, &self.vector_fetch_error) {
            (Some(vectors), _) => Ok(vectors.clone()),
            (None, Some(message)) => Err(anyhow::anyhow!("{message}")),
            (None, None) => Err(anyhow::anyhow!("vectors were not captured")),
        }
    }

    fn replay_efficacy(&self) -> anyhow::Result<EfficacyInputs> {
        match (&self.efficacy, &self.efficacy_fetch_error) {
            (Some(efficacy), _) => Ok(*efficacy),
            (None, Some(message)) => Err(anyhow::anyhow!("{message}")),
            (None, None) => Err(anyhow::anyhow!("efficacy scores were not captured")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub request: TransitionRequest,
    pub inputs: CapturedInputs,
    pub result: DecisionResult,
    pub fingerprint: String,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("record was decided under epoch {recorded:?}, gate holds {gate:?}")]
    EpochMismatch {
        recorded: Box<EpochStamp>,
        gate: Box<EpochStamp>,
    },
    #[error("stored fingerprint does not match the stored result")]
    Tampered,
    #[error("replay diverged: recorded {expected}, replayed {actual}")]
    Diverged { expected: String, actual: String },
}

impl AuditRecord {
    pub fn capture(
        request: TransitionRequest,
        inputs: CapturedInputs,
        result: DecisionResult,
    ) -> Self {
        let fingerprint = result.fingerprint();
        Self {
            request,
            inputs,
            result,
            fingerprint,
        }
    }

    pub fn verify_fingerprint(&self) -> Result<(), ReplayError> {
        if self.result.fingerprint() == self.fingerprint {
            Ok(())
        } else {
            Err(ReplayError::Tampered)
        }
    }

    /// Re-runs the decision from the captured inputs. Recorded fetch
    /// failures are replayed as the same failure; a stage that never ran is
    /// fed a failure, which can only surface if the replay diverges.
    pub fn replay(&self, gate: &DecisionGate) -> Result<DecisionResult, ReplayError> {
        self.verify_fingerprint()?;

        let stamp = gate.epoch().stamp();
        if stamp != self.result.epoch {
            return Err(ReplayError::EpochMismatch {
                recorded: Box::new(self.result.epoch.clone()),
                gate: Box::new(stamp),
            });
        }

        let replayed = gate.evaluate_staged(
            &self.request,
            || self.inputs.replay_vectors(),
            || self.inputs.replay_efficacy(),
        );

        let actual = replayed.fingerprint();
        if actual != self.fingerprint {
            return Err(ReplayError::Diverged {
                expected: self.fingerprint.clone(),
                actual,
            });
        }
        Ok(replayed)
    }
}
