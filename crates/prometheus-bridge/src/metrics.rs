use anyhow::Context;
use decision_gate::DecisionResult;
use gate_core::EpochStamp;
use prometheus::{
    register_gauge_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, Gauge,
    IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder,
};

pub struct GateMetrics {
    pub decisions_total: IntCounterVec,
    pub drift_reports_total: IntCounterVec,
    pub alerting_metrics_total: IntCounterVec,
    pub last_utility_score: Gauge,
    pub active_epoch: IntGauge,
    pub integrity_escalations_total: IntCounter,
}

impl GateMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let decisions_total = register_int_counter_vec_with_registry!(
            "gate_decisions_total",
            "Transition decisions by outcome code",
            &["code", "admissible"],
            registry
        )?;

        let drift_reports_total = register_int_counter_vec_with_registry!(
            "gate_drift_reports_total",
            "Variance reports by aggregate drift status",
            &["status"],
            registry
        )?;

        let alerting_metrics_total = register_int_counter_vec_with_registry!(
            "gate_alerting_metrics_total",
            "Metrics whose delta passed the alert bound",
            &["metric"],
            registry
        )?;

        let last_utility_score = register_gauge_with_registry!(
            "gate_last_utility_score",
            "Most recent efficacy score",
            registry
        )?;

        let active_epoch = register_int_gauge_with_registry!(
            "gate_active_epoch",
            "Policy epoch that decided the latest request",
            registry
        )?;

        let integrity_escalations_total = register_int_counter_with_registry!(
            "gate_integrity_escalations_total",
            "Decisions escalated for integrity violations or anomalies",
            registry
        )?;

        Ok(Self {
            decisions_total,
            drift_reports_total,
            alerting_metrics_total,
            last_utility_score,
            active_epoch,
            integrity_escalations_total,
        })
    }

    pub fn observe(&self, result: &DecisionResult) {
        let admissible = if result.admissible { "true" } else { "false" };
        self.decisions_total
            .with_label_values(&[result.code.as_str(), admissible])
            .inc();

        if let Some(report) = &result.components.vie {
            self.drift_reports_total
                .with_label_values(&[report.status.as_str()])
                .inc();
            for metric in report.alerting_metrics() {
                self.alerting_metrics_total
                    .with_label_values(&[metric.as_str()])
                    .inc();
            }
        }
        if let Some(score) = &result.components.esc {
            self.last_utility_score.set(score.value);
        }
        self.observe_epoch(&result.epoch);
    }

    pub fn observe_epoch(&self, stamp: &EpochStamp) {
        self.active_epoch
            .set(i64::try_from(stamp.epoch_id).unwrap_or(i64::MAX));
    }
}

/// Renders every family in `registry` in the text exposition format.
pub fn encode_text(registry: &Registry) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buf)
        .context("encoding metric families")?;
    String::from_utf8(buf).context("metric text is not utf-8")
}
