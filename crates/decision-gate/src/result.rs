use efficacy_guards::EfficacyScore;
use gate_core::{DecisionCode, EpochStamp, FaultClass};
use integrity_guards::DeltaReport;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TamRecord {
    pub code: DecisionCode,
    /// Present once the authorization step has been reached.
    pub role_matches: Option<usize>,
}

/// Output of each stage that ran. A stage that never ran stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionComponents {
    pub tam: Option<TamRecord>,
    pub vie: Option<DeltaReport>,
    pub esc: Option<EfficacyScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub admissible: bool,
    pub code: DecisionCode,
    pub fault_class: FaultClass,
    pub reason: String,
    pub epoch: EpochStamp,
    pub components: DecisionComponents,
    pub warnings: Vec<DecisionCode>,
}

impl DecisionResult {
    pub(crate) fn reject(
        code: DecisionCode,
        reason: impl Into<String>,
        epoch: EpochStamp,
        components: DecisionComponents,
        warnings: Vec<DecisionCode>,
    ) -> Self {
        Self {
            admissible: false,
            code,
            fault_class: code.fault_class(),
            reason: reason.into(),
            epoch,
            components,
            warnings,
        }
    }

    pub(crate) fn admit(
        code: DecisionCode,
        reason: impl Into<String>,
        epoch: EpochStamp,
        components: DecisionComponents,
        warnings: Vec<DecisionCode>,
    ) -> Self {
        Self {
            admissible: true,
            code,
            fault_class: code.fault_class(),
            reason: reason.into(),
            epoch,
            components,
            warnings,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }

    /// A rejection that needs an operator: tampering, an anomaly, or a
    /// policy fault.
    pub fn is_blocking(&self) -> bool {
        !self.admissible && !self.is_recoverable()
    }

    pub fn canonical_json(&self) -> Vec<u8> {
        // String-keyed maps, enums and floats written through `float_wire`
        // only; serde_json has nothing here it can refuse.
        serde_json::to_vec(self).expect("decision result always serializes")
    }

    /// Hex SHA-256 of the canonical JSON form.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.canonical_json()))
    }
}
