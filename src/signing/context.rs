//! In-memory signing context and detached signatures.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::key::{compute_key_fingerprint, unseal_signing_key};
use super::{SigningError, SigningResult, SIGNATURE_ALGORITHM};

/// Extension appended to a signed file's name for its signature.
pub const SIGNATURE_EXTENSION: &str = "sig";

/// Unlocked signing key, held for the duration of one build.
pub struct SigningContext {
    key: SigningKey,
    fingerprint: String,
}

impl SigningContext {
    /// Unlock sealed key material with its passphrase.
    pub fn load(key_material: &str, passphrase: &str) -> SigningResult<Self> {
        let key = unseal_signing_key(key_material, passphrase)?;
        Ok(Self::from_key(key))
    }

    pub fn from_key(key: SigningKey) -> Self {
        let fingerprint = compute_key_fingerprint(&key.verifying_key());
        Self { key, fingerprint }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// SHA-256 fingerprint of the public key
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Produce a detached signature over `bytes`.
    pub fn sign(&self, bytes: &[u8]) -> DetachedSignature {
        let signature = self.key.sign(bytes);
        DetachedSignature {
            signature: STANDARD.encode(signature.to_bytes()),
            algorithm: SIGNATURE_ALGORITHM.to_string(),
            pubkey_fingerprint: self.fingerprint.clone(),
        }
    }
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// A detached signature over one staged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedSignature {
    /// Base64-encoded Ed25519 signature
    pub signature: String,

    /// Always "Ed25519"
    pub algorithm: String,

    /// SHA-256 fingerprint of the signing public key
    pub pubkey_fingerprint: String,
}

/// Verify a base64 detached signature over `bytes`.
///
/// `Ok(false)` means well-formed but not matching.
pub fn verify_detached(key: &VerifyingKey, bytes: &[u8], signature: &str) -> SigningResult<bool> {
    let sig_bytes = STANDARD.decode(signature.trim())?;
    let signature = Signature::from_slice(&sig_bytes)
        .map_err(|e| SigningError::InvalidSignature(e.to_string()))?;
    Ok(key.verify(bytes, &signature).is_ok())
}
