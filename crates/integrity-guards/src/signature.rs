use ed25519_dalek::{Signature, VerifyingKey};
use gate_core::{CommittedStateVector, PublicKeyRegistry};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureFault {
    #[error("signer key `{0}` is not trusted in this epoch")]
    UnknownSigner(String),
    #[error("signature is not valid hex-encoded ed25519: {0}")]
    Malformed(String),
    #[error("signature does not match the committed payload")]
    Mismatch,
}

pub fn verify_payload(
    payload: &[u8],
    signature_hex: &str,
    key: &VerifyingKey,
) -> Result<(), SignatureFault> {
    let bytes = hex::decode(signature_hex.trim())
        .map_err(|e| SignatureFault::Malformed(e.to_string()))?;
    let signature =
        Signature::from_slice(&bytes).map_err(|e| SignatureFault::Malformed(e.to_string()))?;
    key.verify_strict(payload, &signature)
        .map_err(|_| SignatureFault::Mismatch)
}

pub fn verify_committed_vector(
    committed: &CommittedStateVector,
    registry: &PublicKeyRegistry,
) -> Result<(), SignatureFault> {
    let key = registry
        .get(&committed.signer_key_ref)
        .ok_or_else(|| SignatureFault::UnknownSigner(committed.signer_key_ref.clone()))?;
    verify_payload(&committed.signed_payload(), &committed.signature, key)
}
