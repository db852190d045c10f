//! API key secret generation
//!
//! Generates cryptographically secure key secrets with hashing.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Result of generating a new key secret
#[derive(Debug, Clone)]
pub struct GeneratedSecret {
    /// The full secret (only shown once at creation)
    pub secret: String,
    /// Display prefix for identification in listings
    pub display_prefix: String,
    /// The hashed secret for storage
    pub hash: String,
}

/// Generator for secure API key secrets
#[derive(Debug, Clone)]
pub struct KeyGenerator {
    /// Prefix for all generated secrets (e.g. "bsk_live_", "bsk_test_")
    prefix: String,
    /// Number of random bytes behind each secret
    secret_bytes: usize,
}

impl KeyGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            secret_bytes: 32,
        }
    }

    /// Generator for production keys
    pub fn live() -> Self {
        Self::new("bsk_live_")
    }

    /// Generator for sandbox keys
    pub fn sandbox() -> Self {
        Self::new("bsk_test_")
    }

    /// Generate a fresh secret
    pub fn generate(&self) -> GeneratedSecret {
        let mut random_bytes = vec![0u8; self.secret_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        let encoded = URL_SAFE_NO_PAD.encode(&random_bytes);
        self.assemble(&encoded)
    }

    /// Build a secret from known material, for deterministic test fixtures
    pub fn from_material(&self, material: &str) -> GeneratedSecret {
        self.assemble(material)
    }

    fn assemble(&self, material: &str) -> GeneratedSecret {
        let secret = format!("{}{}", self.prefix, material);
        let display_prefix = format!("{}{}", self.prefix, &material[..8.min(material.len())]);
        let hash = Self::hash_secret(&secret);

        GeneratedSecret {
            secret,
            display_prefix,
            hash,
        }
    }

    /// Hash a secret for storage.
    ///
    /// The digest is deterministic so stored keys can be looked up directly
    /// by the hash of a presented secret.
    pub fn hash_secret(secret: &str) -> String {
        let digest = Sha256::digest(secret.as_bytes());
        format!("sha256${}", URL_SAFE_NO_PAD.encode(digest))
    }

    /// Verify a presented secret against a stored hash
    pub fn verify_secret(secret: &str, stored_hash: &str) -> bool {
        constant_time_compare(&Self::hash_secret(secret), stored_hash)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::live()
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
