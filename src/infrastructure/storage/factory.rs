//! Document store factory for runtime backend selection

use std::sync::Arc;

use crate::domain::storage::DocumentStore;
use crate::domain::DomainError;

use super::in_memory::InMemoryDocumentStore;
use super::postgres::{PostgresConfig, PostgresDocumentStore};

/// Table shared by every collection in the PostgreSQL backend
pub const DOCUMENTS_TABLE: &str = "documents";

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Postgres(PostgresConfig),
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(config: PostgresConfig) -> Self {
        Self::Postgres(config)
    }
}

/// Factory for creating document stores
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates a document store based on the configuration
    ///
    /// The PostgreSQL backend connects and makes sure its table exists.
    pub async fn create(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>, DomainError> {
        match config {
            StorageConfig::InMemory => Ok(Arc::new(InMemoryDocumentStore::new())),
            StorageConfig::Postgres(pg_config) => {
                Ok(Self::create_postgres(pg_config).await?)
            }
        }
    }

    pub async fn create_postgres(
        config: &PostgresConfig,
    ) -> Result<Arc<PostgresDocumentStore>, DomainError> {
        let store = PostgresDocumentStore::connect(config, DOCUMENTS_TABLE).await?;
        store.ensure_table().await?;
        Ok(Arc::new(store))
    }
}
