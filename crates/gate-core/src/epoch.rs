use crate::codes::{DecisionCode, DecisionCoded};
use crate::keys::PublicKeyRegistry;
use crate::policy::{
    AuthorizationModel, GatePolicy, PolicyError, ProtocolSpec, ToleranceProfile, WeightProfile,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// One immutable snapshot of every policy object the gate reads.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyEpoch {
    epoch_id: u64,
    protocol: ProtocolSpec,
    authorization: AuthorizationModel,
    tolerance: ToleranceProfile,
    weights: WeightProfile,
    gate: GatePolicy,
    trusted_keys: PublicKeyRegistry,
}

/// Which policy versions decided a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochStamp {
    pub epoch_id: u64,
    pub protocol_version: String,
    pub authorization_version: String,
    pub tolerance_version: String,
    pub weights_version: String,
}

impl PolicyEpoch {
    /// Validates all objects together; an epoch either loads whole or not at all.
    pub fn new(
        epoch_id: u64,
        protocol: ProtocolSpec,
        authorization: AuthorizationModel,
        tolerance: ToleranceProfile,
        weights: WeightProfile,
        gate: GatePolicy,
        trusted_keys: PublicKeyRegistry,
    ) -> Result<Self, PolicyError> {
        protocol.validate()?;
        authorization.validate(&protocol)?;
        tolerance.validate()?;
        weights.validate()?;
        gate.validate()?;
        Ok(Self {
            epoch_id,
            protocol,
            authorization,
            tolerance,
            weights,
            gate,
            trusted_keys,
        })
    }

    pub fn epoch_id(&self) -> u64 {
        self.epoch_id
    }

    pub fn protocol(&self) -> &ProtocolSpec {
        &self.protocol
    }

    pub fn authorization(&self) -> &AuthorizationModel {
        &self.authorization
    }

    pub fn tolerance(&self) -> &ToleranceProfile {
        &self.tolerance
    }

    pub fn weights(&self) -> &WeightProfile {
        &self.weights
    }

    pub fn gate(&self) -> &GatePolicy {
        &self.gate
    }

    pub fn trusted_keys(&self) -> &PublicKeyRegistry {
        &self.trusted_keys
    }

    pub fn stamp(&self) -> EpochStamp {
        EpochStamp {
            epoch_id: self.epoch_id,
            protocol_version: self.protocol.version.clone(),
            authorization_version: self.authorization.version.clone(),
            tolerance_version: self.tolerance.version.clone(),
            weights_version: self.weights.version.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EpochError {
    #[error("epoch {proposed} does not advance past active epoch {active}")]
    Stale { active: u64, proposed: u64 },
}

impl DecisionCoded for EpochError {
    fn code(&self) -> DecisionCode {
        DecisionCode::PolicySchemaInvalid
    }
}

/// Holds the active epoch. Readers clone the `Arc`; rotation swaps it whole.
#[derive(Debug)]
pub struct EpochStore {
    active: RwLock<Arc<PolicyEpoch>>,
}

impl EpochStore {
    pub fn new(epoch: PolicyEpoch) -> Self {
        Self {
            active: RwLock::new(Arc::new(epoch)),
        }
    }

    pub fn current(&self) -> Arc<PolicyEpoch> {
        // The guarded value is a single Arc, so a poisoned lock still holds a
        // complete snapshot.
        let guard = self.active.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Installs `next` and returns the snapshot it replaced. In-flight
    /// evaluations keep their own `Arc` to the old epoch.
    pub fn rotate(&self, next: PolicyEpoch) -> Result<Arc<PolicyEpoch>, EpochError> {
        let mut guard = self.active.write().unwrap_or_else(|p| p.into_inner());
        if next.epoch_id <= guard.epoch_id {
            return Err(EpochError::Stale {
                active: guard.epoch_id,
                proposed: next.epoch_id,
            });
        }
        Ok(std::mem::replace(&mut *guard, Arc::new(next)))
    }
}
