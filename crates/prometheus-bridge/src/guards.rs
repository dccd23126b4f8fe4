use crate::GateMetrics;
use decision_gate::DecisionResult;
use gate_core::DecisionCode;

/// Records the decision and reports whether it needs operator attention.
pub fn escalate_if_integrity_compromised(metrics: &GateMetrics, result: &DecisionResult) -> bool {
    metrics.observe(result);
    let escalate = matches!(
        result.code,
        DecisionCode::IntegrityViolation | DecisionCode::AnomalyBlock
    );
    if escalate {
        metrics.integrity_escalations_total.inc();
    }
    escalate
}
