//! User infrastructure module
//!
//! Document store backed user repository and the password digest applied
//! at registration.

mod password;
mod repository;

pub use password::{generate_validation_code, PasswordDigest, Sha256Digest};
pub use repository::DocumentUserRepository;
pub(crate) use repository::parse_user_id;
