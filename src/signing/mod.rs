//! Publication signing
//!
//! Signing is decided once per build from the environment-supplied
//! credentials:
//! - `SIGNING_KEY` and `SIGNING_PASSWORD` both non-blank: the sealed key
//!   is unlocked into an in-memory [`SigningContext`] and every staged
//!   file gets a detached Ed25519 signature (`<file>.sig`)
//! - otherwise publications are staged unsigned, which is the normal
//!   state for non-release builds
//!
//! Key material never touches the disk.

mod context;
mod key;
mod state;

pub use context::{verify_detached, DetachedSignature, SigningContext, SIGNATURE_EXTENSION};
pub use key::{
    compute_key_fingerprint, decode_verifying_key, encode_verifying_key, generate_keypair,
    seal_signing_key, seal_signing_key_with_rounds, unseal_signing_key, DEFAULT_KDF_ROUNDS,
    MIN_KDF_ROUNDS, SEALED_KEY_VERSION,
};
pub use state::{resolve_signing_eligibility, SigningState};

use thiserror::Error;

/// Signature algorithm identifier
pub const SIGNATURE_ALGORITHM: &str = "Ed25519";

/// Errors from signing operations
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("signing passphrase does not unlock the signing key")]
    WrongPassphrase,

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("signing is already enabled for this build")]
    AlreadyEnabled,
}

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;
