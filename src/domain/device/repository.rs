//! Device repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::Device;
use crate::domain::DomainError;

/// Repository for devices embedded in user documents
#[async_trait]
pub trait DeviceRepository: Send + Sync + Debug {
    /// Register a device for a user, or refresh the token of the device with
    /// the same address and user agent. Returns the persisted token.
    async fn register(&self, user_id: &str, device: Option<Device>) -> Result<String, DomainError>;

    /// Get one device of a user by device id
    async fn get(&self, user_id: &str, id: &str) -> Result<Device, DomainError>;

    /// Get every device of a user, in registration order
    async fn get_all(&self, user_id: &str) -> Result<Vec<Device>, DomainError>;

    /// Get the device of a user holding the given auth token
    async fn get_by_auth(&self, user_id: &str, token: &str) -> Result<Device, DomainError>;
}
