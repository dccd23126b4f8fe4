use crate::ids::MetricIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const SIGNED_PAYLOAD_TAG: &[u8] = b"ledger-state-vector/v1";

/// State vector as committed and signed by the ledger (V_COM).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedStateVector {
    pub version_hash: String,
    #[serde(with = "crate::float_wire::lossless_map")]
    pub metrics: BTreeMap<MetricIndex, f64>,
    /// Hex-encoded ed25519 signature over [`CommittedStateVector::signed_payload`].
    pub signature: String,
    pub signer_key_ref: String,
}

impl CommittedStateVector {
    pub fn signed_payload(&self) -> Vec<u8> {
        canonical_payload(&self.version_hash, &self.metrics)
    }

    pub fn payload_digest_hex(&self) -> String {
        hex::encode(Sha256::digest(self.signed_payload()))
    }
}

/// Length-prefixed encoding of a committed vector. Values are written as raw
/// IEEE-754 bits so that signing and verification never depend on float
/// formatting.
pub fn canonical_payload(version_hash: &str, metrics: &BTreeMap<MetricIndex, f64>) -> Vec<u8> {
    let mut out = Vec::with_capacity(
        SIGNED_PAYLOAD_TAG.len() + 16 + version_hash.len() + metrics.len() * 24,
    );
    out.extend_from_slice(SIGNED_PAYLOAD_TAG);
    push_bytes(&mut out, version_hash.as_bytes());
    out.extend_from_slice(&(metrics.len() as u64).to_be_bytes());
    for (index, value) in metrics {
        push_bytes(&mut out, index.as_str().as_bytes());
        out.extend_from_slice(&value.to_bits().to_be_bytes());
    }
    out
}

fn push_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Telemetry snapshot (V_RUN).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeMetricVector {
    pub runtime_id: String,
    #[serde(with = "crate::float_wire::lossless_map")]
    pub metrics: BTreeMap<MetricIndex, f64>,
    pub timestamp: DateTime<Utc>,
}
