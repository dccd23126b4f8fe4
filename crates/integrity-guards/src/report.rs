use gate_core::MetricIndex;
use serde::{Deserialize, Serialize};

/// Severity, ordered so that `max()` picks the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftStatus {
    Nominal,
    Drift,
    Anomaly,
}

impl DriftStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DriftStatus::Nominal => "NOMINAL",
            DriftStatus::Drift => "DRIFT",
            DriftStatus::Anomaly => "ANOMALY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashPair {
    pub version_hash: String,
    pub runtime_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceEntry {
    pub metric: MetricIndex,
    #[serde(with = "gate_core::float_wire::lossless")]
    pub delta: f64,
    pub severity: DriftStatus,
    /// `|delta|` is past `alertRatio * maxAbsDelta`.
    pub alerting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnmatchedSide {
    CommittedOnly,
    RuntimeOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedMetric {
    pub metric: MetricIndex,
    pub side: UnmatchedSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaReport {
    pub hash_pair: HashPair,
    pub status: DriftStatus,
    /// Non-nominal metrics only, in metric index order.
    pub variance_vector: Vec<VarianceEntry>,
    pub unmatched: Vec<UnmatchedMetric>,
}

impl DeltaReport {
    pub fn is_nominal(&self) -> bool {
        self.status == DriftStatus::Nominal
    }

    pub fn entry(&self, metric: &MetricIndex) -> Option<&VarianceEntry> {
        self.variance_vector.iter().find(|e| &e.metric == metric)
    }

    pub fn alerting_metrics(&self) -> impl Iterator<Item = &MetricIndex> {
        self.variance_vector
            .iter()
            .filter(|e| e.alerting)
            .map(|e| &e.metric)
    }
}
