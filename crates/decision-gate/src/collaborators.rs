//! Interfaces to the systems around the gate, and the service that wires
//! them to an epoch store.
//!
//! Collaborators are statically typed parameters fixed at construction.
//! Their errors are opaque to the core and are mapped into decision codes
//! by [`DecisionGate::evaluate_staged`].

use crate::audit::{AuditRecord, CapturedInputs};
use crate::gate::{DecisionGate, IntegrityInputs};
use crate::result::DecisionResult;
use anyhow::Context;
use efficacy_guards::EfficacyInputs;
use gate_core::{CommittedStateVector, EpochStore, RuntimeMetricVector};
use std::sync::Arc;
use transition_guards::TransitionRequest;

pub trait LedgerReader {
    fn committed_state_vector(&self, version_hash: &str) -> anyhow::Result<CommittedStateVector>;
}

pub trait TelemetryReader {
    fn runtime_metric_vector(&self, runtime_id: &str) -> anyhow::Result<RuntimeMetricVector>;
}

/// Objective registry.
pub trait GoalHitSource {
    fn goal_hit_score(&self, request: &TransitionRequest) -> anyhow::Result<f64>;
}

/// Resource manager.
pub trait ResourceEfficiencySource {
    fn resource_efficiency_score(&self, request: &TransitionRequest) -> anyhow::Result<f64>;
}

/// Stability auditor. Reports entropy; the gate scores its complement.
pub trait EntropySource {
    fn entropy_score(&self, request: &TransitionRequest) -> anyhow::Result<f64>;
}

pub trait EfficacySource {
    fn efficacy_inputs(&self, request: &TransitionRequest) -> anyhow::Result<EfficacyInputs>;
}

/// Combines the three upstream scorers, each queried independently.
#[derive(Debug, Clone)]
pub struct IndependentSources<G, R, E> {
    pub goals: G,
    pub resources: R,
    pub entropy: E,
}

impl<G, R, E> EfficacySource for IndependentSources<G, R, E>
where
    G: GoalHitSource,
    R: ResourceEfficiencySource,
    E: EntropySource,
{
    fn efficacy_inputs(&self, request: &TransitionRequest) -> anyhow::Result<EfficacyInputs> {
        let goal_hit = self
            .goals
            .goal_hit_score(request)
            .context("objective registry")?;
        let resource_efficiency = self
            .resources
            .resource_efficiency_score(request)
            .context("resource manager")?;
        let entropy = self
            .entropy
            .entropy_score(request)
            .context("stability auditor")?;
        Ok(EfficacyInputs::from_upstream(
            goal_hit,
            resource_efficiency,
            entropy,
        )?)
    }
}

pub struct GateService<L, T, S> {
    store: Arc<EpochStore>,
    ledger: L,
    telemetry: T,
    sources: S,
}

impl<L, T, S> GateService<L, T, S>
where
    L: LedgerReader,
    T: TelemetryReader,
    S: EfficacySource,
{
    pub fn new(store: Arc<EpochStore>, ledger: L, telemetry: T, sources: S) -> Self {
        Self {
            store,
            ledger,
            telemetry,
            sources,
        }
    }

    pub fn store(&self) -> &Arc<EpochStore> {
        &self.store
    }

    fn fetch_vectors(&self, version_hash: &str, runtime_id: &str) -> anyhow::Result<IntegrityInputs> {
        let committed = self
            .ledger
            .committed_state_vector(version_hash)
            .with_context(|| format!("ledger read for {version_hash}"))?;
        let runtime = self
            .telemetry
            .runtime_metric_vector(runtime_id)
            .with_context(|| format!("telemetry read for {runtime_id}"))?;
        Ok(IntegrityInputs { committed, runtime })
    }

    pub fn decide(
        &self,
        request: &TransitionRequest,
        version_hash: &str,
        runtime_id: &str,
    ) -> DecisionResult {
        self.decide_audited(request, version_hash, runtime_id).result
    }

    /// Decides against the epoch active at call time and records every input
    /// that was actually fetched.
    pub fn decide_audited(
        &self,
        request: &TransitionRequest,
        version_hash: &str,
        runtime_id: &str,
    ) -> AuditRecord {
        let gate = DecisionGate::from_store(&self.store);
        let mut captured = CapturedInputs::default();
        let (vectors, vector_fetch_error) = (&mut captured.vectors, &mut captured.vector_fetch_error);
        let (efficacy, efficacy_fetch_error) =
            (&mut captured.efficacy, &mut captured.efficacy_fetch_error);

        let result = gate.evaluate_staged(
            request,
            || match self.fetch_vectors(version_hash, runtime_id) {
                Ok(inputs) => {
                    *vectors = Some(inputs.clone());
                    Ok(inputs)
                }
                Err(err) => {
                    *vector_fetch_error = Some(format!("{err:#}"));
                    Err(err)
                }
            },
            || match self.sources.efficacy_inputs(request) {
                Ok(inputs) => {
                    *efficacy = Some(inputs);
                    Ok(inputs)
                }
                Err(err) => {
                    *efficacy_fetch_error = Some(format!("{err:#}"));
                    Err(err)
                }
            },
        );

        AuditRecord::capture(request.clone(), captured, result)
    }
}
