//! Sealed key material
//!
//! `SIGNING_KEY` carries an Ed25519 seed sealed with `SIGNING_PASSWORD`:
//!
//! ```text
//! base64( version:1 | rounds:4 (BE) | salt:16 | nonce:24 | XChaCha20-Poly1305(seed):48 )
//! ```
//!
//! The sealing key is PBKDF2-HMAC-SHA256(passphrase, salt, rounds). The
//! header is bound as associated data, so a wrong passphrase and a
//! tampered header both fail the AEAD tag.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{SigningError, SigningResult};

/// Version byte of the sealed key format
pub const SEALED_KEY_VERSION: u8 = 2;

/// PBKDF2 rounds used by `keygen`
pub const DEFAULT_KDF_ROUNDS: u32 = 600_000;

/// Sealed keys with fewer rounds are rejected
pub const MIN_KDF_ROUNDS: u32 = 1_000;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;
const SEED_LEN: usize = 32;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = 1 + 4 + SALT_LEN + NONCE_LEN;
const SEALED_LEN: usize = HEADER_LEN + SEED_LEN + TAG_LEN;

fn derive_sealing_key(passphrase: &str, salt: &[u8], rounds: u32) -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, rounds, &mut key[..]);
    key
}

fn cipher(key: &[u8; 32]) -> XChaCha20Poly1305 {
    XChaCha20Poly1305::new(Key::from_slice(key))
}

/// Seal a signing key with [`DEFAULT_KDF_ROUNDS`].
pub fn seal_signing_key(key: &SigningKey, passphrase: &str) -> SigningResult<String> {
    seal_signing_key_with_rounds(key, passphrase, DEFAULT_KDF_ROUNDS)
}

/// Seal a signing key with a fresh salt and nonce.
pub fn seal_signing_key_with_rounds(
    key: &SigningKey,
    passphrase: &str,
    rounds: u32,
) -> SigningResult<String> {
    if rounds < MIN_KDF_ROUNDS {
        return Err(SigningError::InvalidKey(format!(
            "at least {} KDF rounds are required, got {}",
            MIN_KDF_ROUNDS, rounds
        )));
    }

    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut header = Vec::with_capacity(SEALED_LEN);
    header.push(SEALED_KEY_VERSION);
    header.extend_from_slice(&rounds.to_be_bytes());
    header.extend_from_slice(&salt);
    header.extend_from_slice(&nonce);

    let seed = Zeroizing::new(key.to_bytes());
    let sealing_key = derive_sealing_key(passphrase, &salt, rounds);
    let ciphertext = cipher(&sealing_key)
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: seed.as_slice(),
                aad: &header,
            },
        )
        .map_err(|e| SigningError::InvalidKey(format!("sealing failed: {}", e)))?;

    let mut bytes = header;
    bytes.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(bytes))
}

/// Unlock sealed key material.
///
/// Surrounding whitespace is ignored, environment values often carry a
/// trailing newline.
pub fn unseal_signing_key(sealed: &str, passphrase: &str) -> SigningResult<SigningKey> {
    let bytes = STANDARD.decode(sealed.trim())?;
    if bytes.len() != SEALED_LEN {
        return Err(SigningError::InvalidKey(format!(
            "sealed key must be {} bytes, got {}",
            SEALED_LEN,
            bytes.len()
        )));
    }
    if bytes[0] != SEALED_KEY_VERSION {
        return Err(SigningError::InvalidKey(format!(
            "unsupported sealed key version {}",
            bytes[0]
        )));
    }

    let (header, ciphertext) = bytes.split_at(HEADER_LEN);
    let mut rounds_bytes = [0u8; 4];
    rounds_bytes.copy_from_slice(&header[1..5]);
    let rounds = u32::from_be_bytes(rounds_bytes);
    if rounds < MIN_KDF_ROUNDS {
        return Err(SigningError::InvalidKey(format!(
            "sealed key uses {} KDF rounds, at least {} are required",
            rounds, MIN_KDF_ROUNDS
        )));
    }
    let salt = &header[5..5 + SALT_LEN];
    let nonce = &header[5 + SALT_LEN..];

    let sealing_key = derive_sealing_key(passphrase, salt, rounds);
    let seed = Zeroizing::new(
        cipher(&sealing_key)
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: header,
                },
            )
            .map_err(|_| SigningError::WrongPassphrase)?,
    );

    let mut seed_bytes = Zeroizing::new([0u8; SEED_LEN]);
    seed_bytes.copy_from_slice(&seed);
    Ok(SigningKey::from_bytes(&seed_bytes))
}

/// SHA-256 fingerprint of a public key (hex)
pub fn compute_key_fingerprint(key: &VerifyingKey) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Generate a new Ed25519 keypair
pub fn generate_keypair() -> SigningKey {
    SigningKey::generate(&mut rand::thread_rng())
}

pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.as_bytes())
}

pub fn decode_verifying_key(encoded: &str) -> SigningResult<VerifyingKey> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let bytes_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| SigningError::InvalidKey("public key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes_array).map_err(|e| SigningError::InvalidKey(e.to_string()))
}
