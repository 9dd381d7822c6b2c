//! Password digest and validation code generation

use std::fmt::Debug;

use rand::Rng;
use sha2::{Digest, Sha256};

/// Trait for the one-way transform applied to passwords before storage
pub trait PasswordDigest: Send + Sync + Debug {
    /// Digest a clear-text password
    fn digest(&self, password: &str) -> String;
}

/// SHA-256 digest, hex encoded
#[derive(Debug, Clone, Default)]
pub struct Sha256Digest;

impl Sha256Digest {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordDigest for Sha256Digest {
    fn digest(&self, password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }
}

/// Generate a six digit account validation code
pub fn generate_validation_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}
