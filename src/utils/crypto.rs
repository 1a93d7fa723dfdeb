// src/utils/crypto.rs
//! Cryptographic utilities for the reference server.
//!
//! - Certificate signatures: ECDSA over secp256k1 (via `k256`), SHA-256 prehash
//! - Admin passwords: PBKDF2-HMAC-SHA256 (via `ring`) with a random salt

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey};
use rand::rngs::OsRng;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;
use thiserror::Error;

const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
    #[error("system random number generator failed")]
    Rng,
}

/// Signs and checks canonical certificate payloads.
///
/// # Security Notes
/// - The secret key leaves this struct only through `to_base64`
/// - Signatures are deterministic (RFC 6979)
#[derive(Clone)]
pub struct CertificateSigner {
    signing_key: SigningKey,
}

impl CertificateSigner {
    /// Generates a signer with a fresh random key.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Loads a signer from a base64-encoded 32-byte secret scalar.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = base64::decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Base64 form of the secret, accepted by [`CertificateSigner::from_base64`].
    pub fn to_base64(&self) -> String {
        base64::encode(self.signing_key.to_bytes())
    }

    /// Signs `payload` and returns the base64-encoded signature.
    pub fn sign(&self, payload: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(payload);
        base64::encode(signature.to_bytes())
    }

    /// Checks a base64 signature produced by [`CertificateSigner::sign`].
    /// Malformed input is reported as an invalid signature.
    pub fn verify(&self, payload: &[u8], signature_b64: &str) -> bool {
        let Ok(bytes) = base64::decode(signature_b64) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&bytes) else {
            return false;
        };
        self.signing_key
            .verifying_key()
            .verify(payload, &signature)
            .is_ok()
    }
}

/// Hashes a password into `pbkdf2$<iterations>$<salt>$<hash>` form.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| CryptoError::Rng)?;

    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).ok_or(CryptoError::Rng)?;
    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "pbkdf2${}${}${}",
        PBKDF2_ITERATIONS,
        base64::encode(salt),
        base64::encode(hash)
    ))
}

/// Checks a password against a value produced by [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iterations, salt, hash] = parts.as_slice() else {
        return false;
    };
    if *scheme != "pbkdf2" {
        return false;
    }
    let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
        return false;
    };
    let (Ok(salt), Ok(hash)) = (base64::decode(salt), base64::decode(hash)) else {
        return false;
    };
    pbkdf2::verify(pbkdf2::PBKDF2_HMAC_SHA256, iterations, &salt, password.as_bytes(), &hash).is_ok()
}
