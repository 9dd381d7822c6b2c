//! Valhalla data access layer
//!
//! Validated user and device repositories over a document store:
//! - Validation rule engine for inbound users
//! - Explicit user/device document mapping
//! - Update diffs limited to username and devices
//! - Atomic device registration inside the owning user's document

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use domain::{DeviceRepository, DocumentStore, DomainError, UserRepository};
use infrastructure::device::DocumentDeviceRepository;
use infrastructure::storage::StorageFactory;
use infrastructure::user::DocumentUserRepository;

/// Repositories sharing one document store handle
#[derive(Debug, Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub devices: Arc<dyn DeviceRepository>,
}

/// Create the document store selected by the configuration
pub async fn create_document_store(
    config: &AppConfig,
) -> Result<Arc<dyn DocumentStore>, DomainError> {
    let storage = config.storage_config().map_err(|e| {
        DomainError::invalid_request(format!("Invalid database settings: {}", e))
    })?;
    StorageFactory::create(&storage).await
}

/// Wire the user and device repositories over a store
pub fn create_repositories(store: Arc<dyn DocumentStore>) -> Repositories {
    let users: Arc<dyn UserRepository> = Arc::new(DocumentUserRepository::new(store.clone()));
    let devices = Arc::new(DocumentDeviceRepository::new(store, users.clone()));

    Repositories { users, devices }
}
