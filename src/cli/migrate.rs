//! Migrate command - prepares the PostgreSQL backend

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::infrastructure::storage::{StorageConfig, StorageFactory};

pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    let StorageConfig::Postgres(pg) = config.storage_config()? else {
        warn!("Storage backend is in-memory, nothing to migrate");
        return Ok(());
    };

    // creating the store ensures the table and index
    StorageFactory::create_postgres(&pg).await?;
    info!(database = %config.database.name, "Documents table ready");

    Ok(())
}
