use crate::{
    logging, AuditRecord, CapturedInputs, DecisionComponents, DecisionGate, DecisionResult,
    EfficacyInputs, EntropySource, GateService, GoalHitSource, IndependentSources,
    IntegrityInputs, LedgerReader, LogFormat, ReplayError, ResourceEfficiencySource,
    TelemetryReader, TransitionRequest,
};
use chrono::{TimeZone, Utc};
use ed25519_dalek::{Signer, SigningKey};
use gate_core::{
    canonical_payload, AuthorizationModel, Command, CommittedStateVector, Credentials,
    DecisionCode, EpochStore, FaultClass, GatePolicy, MetricIndex, MetricTolerance, PolicyEpoch,
    ProtocolSpec, PublicKeyRegistry, Role, RuntimeMetricVector, StateId, StateRule,
    ToleranceProfile, WeightProfile,
};
use integrity_guards::DriftStatus;
use rand::Rng;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

const SIGNER: &str = "ledger-1";

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

fn rule(commands: &[&str], next: &[&str]) -> StateRule {
    StateRule {
        allowed_commands: commands.iter().map(|c| Command::from(*c)).collect(),
        next_states: next.iter().map(|s| StateId::from(*s)).collect(),
    }
}

fn epoch_with(epoch_id: u64, allow_soft_drift: bool) -> PolicyEpoch {
    let mut states = BTreeMap::new();
    states.insert(StateId::from("DRAFT"), rule(&["SUBMIT", "PING"], &["REVIEW"]));
    states.insert(
        StateId::from("REVIEW"),
        rule(&["APPROVE", "REJECT"], &["COMMITTED", "DRAFT"]),
    );
    states.insert(StateId::from("COMMITTED"), rule(&[], &[]));

    let mut metrics = BTreeMap::new();
    metrics.insert(
        MetricIndex::from("m1"),
        MetricTolerance {
            max_abs_delta: 5.0,
            alert_ratio: 1.5,
            critical_ratio: 2.0,
        },
    );

    PolicyEpoch::new(
        epoch_id,
        ProtocolSpec {
            version: "p-1".into(),
            states,
        },
        AuthorizationModel {
            version: "a-1".into(),
            required_roles: [Role::from("AUDITOR"), Role::from("LEAD")].into_iter().collect(),
            minimum_signature_threshold: 2,
            exempt_transitions: [(StateId::from("REVIEW"), StateId::from("DRAFT"))]
                .into_iter()
                .collect(),
        },
        ToleranceProfile {
            version: "t-1".into(),
            metrics,
        },
        WeightProfile {
            version: "w-1".into(),
            w_goal: 1.0,
            w_resource: 1.0,
            w_resilience: 1.0,
        },
        GatePolicy {
            minimum_utility_threshold: 0.5,
            allow_soft_drift,
        },
        PublicKeyRegistry::new().with_key(SIGNER, signing_key().verifying_key()),
    )
    .unwrap()
}

fn gate(allow_soft_drift: bool) -> DecisionGate {
    DecisionGate::new(Arc::new(epoch_with(1, allow_soft_drift)))
}

fn committed(value: f64) -> CommittedStateVector {
    let metrics: BTreeMap<_, _> = [(MetricIndex::from("m1"), value)].into_iter().collect();
    let version_hash = "v-0001".to_string();
    let signature = signing_key().sign(&canonical_payload(&version_hash, &metrics));
    CommittedStateVector {
        version_hash,
        metrics,
        signature: hex::encode(signature.to_bytes()),
        signer_key_ref: SIGNER.into(),
    }
}

fn runtime(value: f64) -> RuntimeMetricVector {
    RuntimeMetricVector {
        runtime_id: "rt-1".into(),
        metrics: [(MetricIndex::from("m1"), value)].into_iter().collect(),
        timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    }
}

fn vectors(committed_value: f64, runtime_value: f64) -> IntegrityInputs {
    IntegrityInputs {
        committed: committed(committed_value),
        runtime: runtime(runtime_value),
    }
}

fn submit() -> TransitionRequest {
    TransitionRequest::transition("DRAFT", "REVIEW", "SUBMIT", Credentials::new(["AUDITOR", "LEAD"]))
}

fn strong() -> EfficacyInputs {
    EfficacyInputs::new(0.9, 0.8, 0.7)
}

#[test]
fn clean_request_is_admitted() {
    let v = vectors(100.0, 101.0);
    let result = gate(false).evaluate(&submit(), &v.committed, &v.runtime, &strong());
    assert!(result.admissible);
    assert_eq!(result.code, DecisionCode::Success);
    assert_eq!(result.fault_class, FaultClass::None);
    assert!(result.warnings.is_empty());
    assert_eq!(result.epoch.epoch_id, 1);

    let components = &result.components;
    assert_eq!(components.tam.as_ref().unwrap().role_matches, Some(2));
    assert_eq!(components.vie.as_ref().unwrap().status, DriftStatus::Nominal);
    assert!((components.esc.as_ref().unwrap().value - 0.8).abs() < 1e-12);
}

#[test]
fn authorization_failure_never_fetches_later_inputs() {
    let vector_calls = Cell::new(0);
    let efficacy_calls = Cell::new(0);
    let request =
        TransitionRequest::transition("DRAFT", "REVIEW", "SUBMIT", Credentials::new(["AUDITOR"]));

    let result = gate(false).evaluate_staged(
        &request,
        || {
            vector_calls.set(vector_calls.get() + 1);
            Ok(vectors(100.0, 100.0))
        },
        || {
            efficacy_calls.set(efficacy_calls.get() + 1);
            Ok(strong())
        },
    );

    assert!(!result.admissible);
    assert_eq!(result.code, DecisionCode::AuthInsufficient);
    assert_eq!(result.fault_class, FaultClass::Authorization);
    assert_eq!(result.components.tam.as_ref().unwrap().role_matches, Some(1));
    assert!(result.components.vie.is_none());
    assert!(result.components.esc.is_none());
    assert_eq!(vector_calls.get(), 0);
    assert_eq!(efficacy_calls.get(), 0);
}

#[test]
fn structural_defects_stop_at_first_stage() {
    let g = gate(false);
    let cases = [
        (
            TransitionRequest::transition("LIMBO", "REVIEW", "SUBMIT", Credentials::default()),
            DecisionCode::StateUndefined,
        ),
        (
            TransitionRequest::transition("DRAFT", "REVIEW", "APPROVE", Credentials::default()),
            DecisionCode::CommandDisallowed,
        ),
        (
            TransitionRequest::transition("DRAFT", "COMMITTED", "SUBMIT", Credentials::default()),
            DecisionCode::TransitionInvalid,
        ),
    ];
    for (request, code) in cases {
        let result = g.evaluate_staged(
            &request,
            || panic!("vectors fetched for {code}"),
            || panic!("efficacy fetched for {code}"),
        );
        assert_eq!(result.code, code);
        assert_eq!(result.fault_class, FaultClass::Structural);
        assert_eq!(result.components.tam.as_ref().unwrap().role_matches, None);
    }
}

#[test]
fn anomaly_blocks_before_scoring() {
    let result = gate(true).evaluate_staged(
        &submit(),
        || Ok(vectors(100.0, 200.0)),
        || panic!("efficacy fetched after an anomaly"),
    );
    assert!(!result.admissible);
    assert_eq!(result.code, DecisionCode::AnomalyBlock);
    let report = result.components.vie.as_ref().unwrap();
    assert_eq!(report.status, DriftStatus::Anomaly);
    assert_eq!(report.variance_vector[0].delta, 100.0);
    assert!(result.components.esc.is_none());
}

#[test]
fn soft_drift_is_admitted_with_warning_when_allowed() {
    let v = vectors(100.0, 107.0);
    let result = gate(true).evaluate(&submit(), &v.committed, &v.runtime, &strong());
    assert!(result.admissible);
    assert_eq!(result.code, DecisionCode::Success);
    assert_eq!(result.warnings, vec![DecisionCode::DriftWarning]);
    assert_eq!(
        result.components.vie.as_ref().unwrap().status,
        DriftStatus::Drift
    );
}

#[test]
fn soft_drift_is_rejected_when_not_allowed() {
    let result = gate(false).evaluate_staged(
        &submit(),
        || Ok(vectors(100.0, 107.0)),
        || panic!("efficacy fetched after disallowed drift"),
    );
    assert!(!result.admissible);
    assert_eq!(result.code, DecisionCode::DriftWarning);
    assert_eq!(result.fault_class, FaultClass::Drift);
    assert!(result.is_recoverable());
}

#[test]
fn bad_signature_is_integrity_violation() {
    let mut v = vectors(100.0, 100.0);
    v.committed.metrics.insert(MetricIndex::from("m1"), 99.0);
    let result = gate(false).evaluate(&submit(), &v.committed, &v.runtime, &strong());
    assert!(!result.admissible);
    assert_eq!(result.code, DecisionCode::IntegrityViolation);
    assert_eq!(result.fault_class, FaultClass::Integrity);
    assert!(!result.is_recoverable());
    assert!(result.components.vie.is_none());
}

#[test]
fn fetch_failures_map_to_stage_codes() {
    let g = gate(false);

    let result = g.evaluate_staged(
        &submit(),
        || Err(anyhow::anyhow!("ledger offline")),
        || Ok(strong()),
    );
    assert_eq!(result.code, DecisionCode::IntegrityViolation);
    assert!(result.reason.contains("ledger offline"));

    let result = g.evaluate_staged(
        &submit(),
        || Ok(vectors(100.0, 100.0)),
        || Err(anyhow::anyhow!("objective registry timed out")),
    );
    assert_eq!(result.code, DecisionCode::InvalidVectorScore);
    assert!(result.reason.contains("objective registry timed out"));
    assert!(result.components.vie.is_some());
}

#[test]
fn out_of_range_score_is_rejected() {
    let v = vectors(100.0, 100.0);
    let result = gate(false).evaluate(
        &submit(),
        &v.committed,
        &v.runtime,
        &EfficacyInputs::new(1.2, 0.5, 0.5),
    );
    assert_eq!(result.code, DecisionCode::InvalidVectorScore);
    assert!(result.components.esc.is_none());
}

#[test]
fn utility_threshold_is_inclusive() {
    let g = gate(false);
    let v = vectors(100.0, 100.0);

    let at = g.evaluate(&submit(), &v.committed, &v.runtime, &EfficacyInputs::new(0.5, 0.5, 0.5));
    assert!(at.admissible);
    assert_eq!(at.components.esc.as_ref().unwrap().value, 0.5);

    let below = g.evaluate(&submit(), &v.committed, &v.runtime, &EfficacyInputs::new(0.5, 0.5, 0.4));
    assert!(!below.admissible);
    assert_eq!(below.code, DecisionCode::InsufficientUtility);
    assert_eq!(below.fault_class, FaultClass::Utility);
    assert!(below.components.esc.is_some());
}

#[test]
fn exempt_edge_admits_with_exempt_code() {
    let request = TransitionRequest::transition("REVIEW", "DRAFT", "REJECT", Credentials::default());
    let v = vectors(100.0, 100.0);
    let result = gate(false).evaluate(&request, &v.committed, &v.runtime, &strong());
    assert!(result.admissible);
    assert_eq!(result.code, DecisionCode::AuthExempt);
    assert_eq!(result.fault_class, FaultClass::None);
}

#[test]
fn command_only_request_runs_every_stage() {
    let request = TransitionRequest::command_only("DRAFT", "PING", Credentials::default());
    let v = vectors(100.0, 100.0);
    let result = gate(false).evaluate(&request, &v.committed, &v.runtime, &strong());
    assert!(result.admissible);
    assert_eq!(result.code, DecisionCode::Success);
    assert!(result.components.vie.is_some());
    assert!(result.components.esc.is_some());
}

#[test]
fn identical_inputs_give_identical_fingerprints() {
    let g = gate(true);
    let mut rng = rand::thread_rng();
    for _ in 0..100 {
        let v = vectors(100.0, 100.0 + rng.gen_range(-15.0..15.0));
        let inputs = EfficacyInputs::new(
            rng.gen_range(0.0..=1.0),
            rng.gen_range(0.0..=1.0),
            rng.gen_range(0.0..=1.0),
        );
        let first = g.evaluate(&submit(), &v.committed, &v.runtime, &inputs);
        let second = g.evaluate(&submit(), &v.committed, &v.runtime, &inputs);
        assert_eq!(first.canonical_json(), second.canonical_json());
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint().len(), 64);
    }
}

#[test]
fn result_serializes_with_wire_codes() {
    let request =
        TransitionRequest::transition("DRAFT", "REVIEW", "SUBMIT", Credentials::new(["AUDITOR"]));
    let result = gate(false).evaluate_staged(&request, || unreachable!(), || unreachable!());
    let json: serde_json::Value = serde_json::from_slice(&result.canonical_json()).unwrap();
    assert_eq!(json["code"], "AUTH_INSUFFICIENT");
    assert_eq!(json["admissible"], false);
    assert_eq!(json["epoch"]["epochId"], 1);
}

#[test]
fn audit_record_replays_to_same_fingerprint() {
    let g = gate(true);
    let v = vectors(100.0, 106.0);
    let result = g.evaluate(&submit(), &v.committed, &v.runtime, &strong());
    let record = AuditRecord::capture(submit(), CapturedInputs::resolved(v, strong()), result);

    let replayed = record.replay(&g).unwrap();
    assert_eq!(replayed, record.result);

    let restored: AuditRecord =
        serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
    assert!(restored.replay(&g).is_ok());
}

#[test]
fn anomalous_record_with_non_finite_delta_survives_storage() {
    let g = gate(false);
    for (committed_value, runtime_value) in [(-1e308, 1e308), (1e308, -1e308), (100.0, f64::NAN)] {
        let v = vectors(committed_value, runtime_value);
        let result = g.evaluate(&submit(), &v.committed, &v.runtime, &strong());
        assert_eq!(result.code, DecisionCode::AnomalyBlock);
        assert!(!result.components.vie.as_ref().unwrap().variance_vector[0]
            .delta
            .is_finite());

        let record = AuditRecord::capture(submit(), CapturedInputs::resolved(v, strong()), result);
        let stored = serde_json::to_string(&record).unwrap();
        let restored: AuditRecord = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored.fingerprint, record.fingerprint);
        assert_eq!(restored.result.fingerprint(), record.fingerprint);
        assert_eq!(restored.replay(&g).unwrap().fingerprint(), record.fingerprint);
    }
}

#[test]
fn nan_and_infinite_deltas_fingerprint_differently() {
    let g = gate(false);
    let fingerprint = |runtime_value: f64| {
        let v = vectors(100.0, runtime_value);
        g.evaluate(&submit(), &v.committed, &v.runtime, &strong())
            .fingerprint()
    };
    let nan = fingerprint(f64::NAN);
    let inf = fingerprint(f64::INFINITY);
    let neg_inf = fingerprint(f64::NEG_INFINITY);
    assert_ne!(nan, inf);
    assert_ne!(inf, neg_inf);
    assert_ne!(nan, neg_inf);
}

#[test]
fn only_tampering_anomalies_and_policy_faults_block() {
    let stamp = epoch_with(1, false).stamp();
    let rejected = [
        (DecisionCode::StateUndefined, false),
        (DecisionCode::CommandDisallowed, false),
        (DecisionCode::TransitionInvalid, false),
        (DecisionCode::AuthInsufficient, false),
        (DecisionCode::IntegrityViolation, true),
        (DecisionCode::AnomalyBlock, true),
        (DecisionCode::DriftWarning, false),
        (DecisionCode::InsufficientUtility, false),
        (DecisionCode::InvalidVectorScore, true),
        (DecisionCode::DegenerateWeights, true),
        (DecisionCode::PolicySchemaInvalid, true),
    ];
    for (code, blocking) in rejected {
        let result = DecisionResult::reject(
            code,
            "rejected",
            stamp.clone(),
            DecisionComponents::default(),
            Vec::new(),
        );
        assert_eq!(result.is_blocking(), blocking, "{code}");
    }
    let admitted = DecisionResult::admit(
        DecisionCode::Success,
        "admitted",
        stamp,
        DecisionComponents::default(),
        Vec::new(),
    );
    assert!(!admitted.is_blocking());
}

#[test]
fn tampered_record_is_refused() {
    let g = gate(false);
    let v = vectors(100.0, 100.0);
    let result = g.evaluate(&submit(), &v.committed, &v.runtime, &strong());
    let mut record = AuditRecord::capture(submit(), CapturedInputs::resolved(v, strong()), result);
    record.result.admissible = false;
    assert!(matches!(record.replay(&g), Err(ReplayError::Tampered)));
}

#[test]
fn altered_inputs_diverge_on_replay() {
    let g = gate(false);
    let v = vectors(100.0, 100.0);
    let result = g.evaluate(&submit(), &v.committed, &v.runtime, &strong());
    let mut record = AuditRecord::capture(
        submit(),
        CapturedInputs::resolved(v, strong()),
        result,
    );
    record.inputs.efficacy = Some(EfficacyInputs::new(0.1, 0.1, 0.1));
    assert!(matches!(
        record.replay(&g),
        Err(ReplayError::Diverged { .. })
    ));
}

#[test]
fn replay_under_other_epoch_is_refused() {
    let g = gate(false);
    let v = vectors(100.0, 100.0);
    let result = g.evaluate(&submit(), &v.committed, &v.runtime, &strong());
    let record = AuditRecord::capture(submit(), CapturedInputs::resolved(v, strong()), result);

    let later = DecisionGate::new(Arc::new(epoch_with(2, false)));
    match record.replay(&later) {
        Err(ReplayError::EpochMismatch { recorded, gate }) => {
            assert_eq!(recorded.epoch_id, 1);
            assert_eq!(gate.epoch_id, 2);
        }
        other => panic!("expected epoch mismatch, got {other:?}"),
    }
}

struct FixedLedger {
    value: f64,
    reads: Rc<Cell<usize>>,
}

impl LedgerReader for FixedLedger {
    fn committed_state_vector(&self, version_hash: &str) -> anyhow::Result<CommittedStateVector> {
        self.reads.set(self.reads.get() + 1);
        anyhow::ensure!(version_hash == "v-0001", "unknown version {version_hash}");
        Ok(committed(self.value))
    }
}

struct FixedTelemetry(f64);

impl TelemetryReader for FixedTelemetry {
    fn runtime_metric_vector(&self, runtime_id: &str) -> anyhow::Result<RuntimeMetricVector> {
        anyhow::ensure!(runtime_id == "rt-1", "no telemetry for {runtime_id}");
        Ok(runtime(self.0))
    }
}

struct Score(f64);

impl GoalHitSource for Score {
    fn goal_hit_score(&self, _request: &TransitionRequest) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

impl ResourceEfficiencySource for Score {
    fn resource_efficiency_score(&self, _request: &TransitionRequest) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

struct Entropy(Option<f64>);

impl EntropySource for Entropy {
    fn entropy_score(&self, _request: &TransitionRequest) -> anyhow::Result<f64> {
        self.0.ok_or_else(|| anyhow::anyhow!("auditor unavailable"))
    }
}

type TestService = GateService<FixedLedger, FixedTelemetry, IndependentSources<Score, Score, Entropy>>;

fn service_counting(entropy: Option<f64>, reads: Rc<Cell<usize>>) -> TestService {
    GateService::new(
        Arc::new(EpochStore::new(epoch_with(1, false))),
        FixedLedger { value: 100.0, reads },
        FixedTelemetry(101.0),
        IndependentSources {
            goals: Score(0.9),
            resources: Score(0.8),
            entropy: Entropy(entropy),
        },
    )
}

fn service(entropy: Option<f64>) -> TestService {
    service_counting(entropy, Rc::default())
}

#[test]
fn service_wires_collaborators_into_the_gate() {
    let reads = Rc::new(Cell::new(0));
    let svc = service_counting(Some(0.2), Rc::clone(&reads));
    let record = svc.decide_audited(&submit(), "v-0001", "rt-1");
    assert!(record.result.admissible);
    assert_eq!(record.inputs.efficacy, Some(EfficacyInputs::new(0.9, 0.8, 0.8)));
    assert!(record.inputs.vectors.is_some());
    assert_eq!(reads.get(), 1);

    let g = DecisionGate::new(svc.store().current());
    assert_eq!(record.replay(&g).unwrap(), record.result);
}

#[test]
fn service_maps_collaborator_errors() {
    let svc = service(Some(0.2));
    let result = svc.decide(&submit(), "v-9999", "rt-1");
    assert_eq!(result.code, DecisionCode::IntegrityViolation);
    assert!(result.reason.contains("v-9999"));

    let result = svc.decide(&submit(), "v-0001", "rt-404");
    assert_eq!(result.code, DecisionCode::IntegrityViolation);

    let svc = service(None);
    let record = svc.decide_audited(&submit(), "v-0001", "rt-1");
    assert_eq!(record.result.code, DecisionCode::InvalidVectorScore);
    assert!(record.result.reason.contains("stability auditor"));
    assert!(record.inputs.efficacy_fetch_error.is_some());
    let g = DecisionGate::new(svc.store().current());
    assert_eq!(record.replay(&g).unwrap(), record.result);

    let svc = service(Some(1.5));
    assert_eq!(
        svc.decide(&submit(), "v-0001", "rt-1").code,
        DecisionCode::InvalidVectorScore
    );
}

#[test]
fn service_skips_ledger_when_authorization_fails() {
    let reads = Rc::new(Cell::new(0));
    let svc = service_counting(Some(0.2), Rc::clone(&reads));
    let request =
        TransitionRequest::transition("DRAFT", "REVIEW", "SUBMIT", Credentials::new(["LEAD"]));
    let result = svc.decide(&request, "v-0001", "rt-1");
    assert_eq!(result.code, DecisionCode::AuthInsufficient);
    assert_eq!(reads.get(), 0);
}

#[test]
fn service_follows_epoch_rotation() {
    let svc = service(Some(0.2));
    assert_eq!(svc.decide(&submit(), "v-0001", "rt-1").epoch.epoch_id, 1);
    svc.store().rotate(epoch_with(2, false)).unwrap();
    assert_eq!(svc.decide(&submit(), "v-0001", "rt-1").epoch.epoch_id, 2);
}

#[test]
fn log_format_parses_lowercase() {
    let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
    assert_eq!(format, LogFormat::Json);
    assert_eq!(LogFormat::default(), LogFormat::Plain);

    // Another test binary may have installed a subscriber first; either way
    // a second install must fail.
    let _ = logging::init(LogFormat::Json, tracing::Level::DEBUG);
    assert!(logging::init(LogFormat::Plain, tracing::Level::INFO).is_err());
}
