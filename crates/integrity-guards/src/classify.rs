use crate::report::DriftStatus;
use gate_core::MetricTolerance;

/// Places one delta in its band. A value exactly on a boundary belongs to
/// the less severe band: `|d| == maxAbsDelta` is nominal and
/// `|d| == criticalRatio * maxAbsDelta` is drift.
///
/// Every comparison is written so that NaN falls through to `Anomaly`.
pub fn classify_delta(delta: f64, tolerance: &MetricTolerance) -> DriftStatus {
    let magnitude = delta.abs();
    if tolerance.max_abs_delta == 0.0 {
        return if magnitude == 0.0 {
            DriftStatus::Nominal
        } else {
            DriftStatus::Anomaly
        };
    }
    if magnitude <= tolerance.max_abs_delta {
        DriftStatus::Nominal
    } else if magnitude <= tolerance.critical_bound() {
        DriftStatus::Drift
    } else {
        DriftStatus::Anomaly
    }
}

pub(crate) fn is_alerting(delta: f64, tolerance: &MetricTolerance) -> bool {
    !(delta.abs() <= tolerance.alert_bound())
}
