//! Device auth token generation

use std::fmt::Debug;

use rand::RngCore;

/// Trait for issuing device auth tokens
pub trait AuthTokenGenerator: Send + Sync + Debug {
    fn generate(&self) -> String;
}

/// Number of random bytes per token
pub const TOKEN_BYTES: usize = 32;

/// Random tokens, hex encoded
#[derive(Debug, Clone, Default)]
pub struct RandomTokenGenerator;

impl RandomTokenGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl AuthTokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        let mut random_bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut random_bytes);
        hex::encode(random_bytes)
    }
}
