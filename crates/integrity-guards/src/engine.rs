use crate::classify::{classify_delta, is_alerting};
use crate::report::{
    DeltaReport, DriftStatus, HashPair, UnmatchedMetric, UnmatchedSide, VarianceEntry,
};
use crate::signature::{verify_committed_vector, SignatureFault};
use gate_core::{
    CommittedStateVector, DecisionCode, DecisionCoded, MetricIndex, PublicKeyRegistry,
    RuntimeMetricVector, ToleranceProfile,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Reasons no report could be produced. None of these is ever downgraded
/// to a nominal result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("committed vector {version_hash} failed verification: {fault}")]
    Signature {
        version_hash: String,
        fault: SignatureFault,
    },
    #[error("tolerance profile has no entry for matched metric `{0}`")]
    ToleranceUndefined(MetricIndex),
}

impl DecisionCoded for IntegrityError {
    fn code(&self) -> DecisionCode {
        match self {
            IntegrityError::Signature { .. } => DecisionCode::IntegrityViolation,
            IntegrityError::ToleranceUndefined(_) => DecisionCode::PolicySchemaInvalid,
        }
    }
}

struct Alignment<'a> {
    matched: Vec<(&'a MetricIndex, f64, f64)>,
    unmatched: Vec<UnmatchedMetric>,
}

/// Both maps are ordered, so one merge walk yields matched pairs and
/// one-sided indices already sorted.
fn align<'a>(committed: &'a CommittedStateVector, runtime: &'a RuntimeMetricVector) -> Alignment<'a> {
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();
    let mut com = committed.metrics.iter().peekable();
    let mut run = runtime.metrics.iter().peekable();

    loop {
        match (com.peek(), run.peek()) {
            (Some((ci, cv)), Some((ri, rv))) => match ci.cmp(ri) {
                std::cmp::Ordering::Equal => {
                    matched.push((*ci, **cv, **rv));
                    com.next();
                    run.next();
                }
                std::cmp::Ordering::Less => {
                    unmatched.push(UnmatchedMetric {
                        metric: (*ci).clone(),
                        side: UnmatchedSide::CommittedOnly,
                    });
                    com.next();
                }
                std::cmp::Ordering::Greater => {
                    unmatched.push(UnmatchedMetric {
                        metric: (*ri).clone(),
                        side: UnmatchedSide::RuntimeOnly,
                    });
                    run.next();
                }
            },
            (Some((ci, _)), None) => {
                unmatched.push(UnmatchedMetric {
                    metric: (*ci).clone(),
                    side: UnmatchedSide::CommittedOnly,
                });
                com.next();
            }
            (None, Some((ri, _))) => {
                unmatched.push(UnmatchedMetric {
                    metric: (*ri).clone(),
                    side: UnmatchedSide::RuntimeOnly,
                });
                run.next();
            }
            (None, None) => break,
        }
    }

    Alignment { matched, unmatched }
}

/// Verifies the committed vector and classifies runtime drift against it.
pub fn evaluate(
    committed: &CommittedStateVector,
    runtime: &RuntimeMetricVector,
    tolerance: &ToleranceProfile,
    keys: &PublicKeyRegistry,
) -> Result<DeltaReport, IntegrityError> {
    let alignment = align(committed, runtime);

    if let Err(fault) = verify_committed_vector(committed, keys) {
        warn!(
            version_hash = %committed.version_hash,
            signer = %committed.signer_key_ref,
            %fault,
            "committed state vector failed verification"
        );
        return Err(IntegrityError::Signature {
            version_hash: committed.version_hash.clone(),
            fault,
        });
    }

    let mut status = DriftStatus::Nominal;
    let mut variance_vector = Vec::new();
    for (metric, committed_value, runtime_value) in alignment.matched {
        let tol = tolerance
            .get(metric)
            .ok_or_else(|| IntegrityError::ToleranceUndefined(metric.clone()))?;
        let delta = runtime_value - committed_value;
        let severity = classify_delta(delta, tol);
        status = status.max(severity);
        if severity != DriftStatus::Nominal {
            variance_vector.push(VarianceEntry {
                metric: metric.clone(),
                delta,
                severity,
                alerting: is_alerting(delta, tol),
            });
        }
    }

    debug!(
        version_hash = %committed.version_hash,
        runtime_id = %runtime.runtime_id,
        ?status,
        flagged = variance_vector.len(),
        unmatched = alignment.unmatched.len(),
        "variance evaluated"
    );

    Ok(DeltaReport {
        hash_pair: HashPair {
            version_hash: committed.version_hash.clone(),
            runtime_id: runtime.runtime_id.clone(),
        },
        status,
        variance_vector,
        unmatched: alignment.unmatched,
    })
}
