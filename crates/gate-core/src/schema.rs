//! JSON policy documents.
//!
//! Every key listed for an entity is mandatory. A missing or mistyped key
//! surfaces as [`PolicyError::Malformed`], a well-formed but unusable value
//! as [`PolicyError::Invalid`]; both map to `POLICY_SCHEMA_INVALID`. A
//! weight profile that cannot be normalized is
//! [`PolicyError::DegenerateWeights`] and keeps its own code.

use crate::epoch::PolicyEpoch;
use crate::keys::PublicKeyRegistry;
use crate::policy::{
    AuthorizationModel, GatePolicy, PolicyError, ProtocolSpec, ToleranceProfile, WeightProfile,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All policy objects of one epoch, as delivered by the policy loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBundle {
    pub epoch: u64,
    pub protocol: ProtocolSpec,
    pub authorization: AuthorizationModel,
    pub tolerance: ToleranceProfile,
    pub weights: WeightProfile,
    pub gate: GatePolicy,
    pub trusted_keys: BTreeMap<String, String>,
}

impl PolicyBundle {
    pub const ENTITY: &'static str = "PolicyBundle";

    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        parse_document(Self::ENTITY, json)
    }

    pub fn into_epoch(self) -> Result<PolicyEpoch, PolicyError> {
        let keys = PublicKeyRegistry::from_hex_map(&self.trusted_keys)?;
        PolicyEpoch::new(
            self.epoch,
            self.protocol,
            self.authorization,
            self.tolerance,
            self.weights,
            self.gate,
            keys,
        )
    }
}

pub fn parse_document<T: DeserializeOwned>(
    entity: &'static str,
    json: &str,
) -> Result<T, PolicyError> {
    serde_json::from_str(json).map_err(|source| PolicyError::Malformed { entity, source })
}

pub fn load_epoch(json: &str) -> Result<PolicyEpoch, PolicyError> {
    PolicyBundle::from_json(json)?.into_epoch()
}

impl ProtocolSpec {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let spec: Self = parse_document(Self::ENTITY, json)?;
        spec.validate()?;
        Ok(spec)
    }
}

impl AuthorizationModel {
    /// Exempt pairs are checked against the protocol graph only when the
    /// model is assembled into a [`PolicyEpoch`].
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        parse_document(Self::ENTITY, json)
    }
}

impl ToleranceProfile {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let profile: Self = parse_document(Self::ENTITY, json)?;
        profile.validate()?;
        Ok(profile)
    }
}

impl WeightProfile {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let weights: Self = parse_document(Self::ENTITY, json)?;
        weights.validate()?;
        Ok(weights)
    }
}

impl GatePolicy {
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let gate: Self = parse_document(Self::ENTITY, json)?;
        gate.validate()?;
        Ok(gate)
    }
}
