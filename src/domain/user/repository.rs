//! User repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::User;
use crate::domain::DomainError;

/// Repository trait for user storage
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    /// Validate and store a new user, returning its identifier
    async fn register(&self, user: Option<User>) -> Result<String, DomainError>;

    /// Get a user by identifier; a secure read strips the password
    async fn get(&self, id: &str, secure: bool) -> Result<User, DomainError>;

    /// Get a user by email; a secure read strips the password
    async fn get_by_email(&self, email: &str, secure: bool) -> Result<User, DomainError>;

    /// Delete a user
    async fn delete(&self, id: &str) -> Result<(), DomainError>;

    /// Apply the username and device changes of `user` to the stored user
    async fn update(&self, id: &str, user: Option<User>) -> Result<(), DomainError>;

    async fn update_profile_picture(&self, _id: &str, _path: &str) -> Result<(), DomainError> {
        Err(DomainError::not_implemented("Updating the profile picture"))
    }

    async fn login(&self, _user: &User) -> Result<String, DomainError> {
        Err(DomainError::not_implemented("Login"))
    }

    async fn login_with_auth(&self, _token: &str) -> Result<User, DomainError> {
        Err(DomainError::not_implemented("Login with auth token"))
    }

    async fn validate_account(&self, _code: &str) -> Result<(), DomainError> {
        Err(DomainError::not_implemented("Account validation"))
    }
}
