use crate::policy::PolicyError;
use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use std::collections::BTreeMap;

/// Ledger signer keys trusted for one epoch, by `signerKeyRef`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicKeyRegistry {
    keys: BTreeMap<String, VerifyingKey>,
}

impl PublicKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key_ref: impl Into<String>, key: VerifyingKey) {
        self.keys.insert(key_ref.into(), key);
    }

    pub fn with_key(mut self, key_ref: impl Into<String>, key: VerifyingKey) -> Self {
        self.insert(key_ref, key);
        self
    }

    pub fn get(&self, key_ref: &str) -> Option<&VerifyingKey> {
        self.keys.get(key_ref)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_refs(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    /// Builds the registry from `keyRef -> hex(public key)` pairs.
    pub fn from_hex_map(entries: &BTreeMap<String, String>) -> Result<Self, PolicyError> {
        let mut registry = Self::new();
        for (key_ref, encoded) in entries {
            let key = decode_verifying_key(encoded).map_err(|reason| PolicyError::InvalidKey {
                key_ref: key_ref.clone(),
                reason,
            })?;
            registry.insert(key_ref.clone(), key);
        }
        Ok(registry)
    }

    pub fn to_hex_map(&self) -> BTreeMap<String, String> {
        self.keys
            .iter()
            .map(|(k, v)| (k.clone(), hex::encode(v.as_bytes())))
            .collect()
    }
}

fn decode_verifying_key(encoded: &str) -> Result<VerifyingKey, String> {
    let bytes = hex::decode(encoded.trim()).map_err(|e| e.to_string())?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("expected {PUBLIC_KEY_LENGTH} bytes, got {}", bytes.len()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| e.to_string())
}
