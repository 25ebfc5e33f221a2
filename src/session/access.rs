// src/session/access.rs
use sha2::{Digest, Sha256};

/// All-or-nothing gate: one shared secret, stored only as `sha256(salt || secret)`.
#[derive(Debug, Clone)]
pub struct AccessGate {
    salt: String,
    expected_hash: String,
}

impl AccessGate {
    /// `expected_hash` is the lowercase hex digest; surrounding whitespace and case are ignored.
    pub fn new(salt: impl Into<String>, expected_hash: &str) -> Self {
        Self {
            salt: salt.into(),
            expected_hash: expected_hash.trim().to_lowercase(),
        }
    }

    /// Hex digest stored for `secret` under `salt`.
    pub fn hash_secret(salt: &str, secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(secret.as_bytes());
        let result = hasher.finalize();

        format!("{:x}", result)
    }

    pub fn verify(&self, secret: &str) -> bool {
        let candidate = Self::hash_secret(&self.salt, secret);
        constant_time_eq(candidate.as_bytes(), self.expected_hash.as_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
