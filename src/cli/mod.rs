//! CLI module for the Valhalla data access layer
//!
//! Provides subcommands operating on the configured document store:
//! - `migrate`: create the PostgreSQL documents table
//! - `user`: register, inspect, rename and delete users
//! - `device`: register devices and look them up
//!
//! Results are printed to stdout as JSON.

pub mod device;
pub mod migrate;
pub mod user;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::error;

use crate::config::AppConfig;
use crate::domain::DomainError;
use crate::infrastructure::logging;
use crate::Repositories;

/// Valhalla data access layer - user and device repositories
#[derive(Parser)]
#[command(name = "valhalla-dal")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Run against the test database instead of the configured one
    #[arg(long, global = true)]
    pub test_database: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Ensure the PostgreSQL documents table exists
    Migrate,

    /// Manage users
    #[command(subcommand)]
    User(user::UserCommand),

    /// Manage devices of a user
    #[command(subcommand)]
    Device(device::DeviceCommand),
}

/// Load configuration and install logging
pub fn init(cli: &Cli) -> AppConfig {
    let mut config = AppConfig::load().unwrap_or_default();
    if cli.test_database {
        config.database = config.database.for_tests();
    }
    logging::init_logging(&config.logging);
    config
}

/// Build the repositories over the configured store
pub async fn repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    let store = crate::create_document_store(config).await?;
    Ok(crate::create_repositories(store))
}

/// Log repository failures with their code and status before exiting
pub fn report(result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Some(err) = result.as_ref().err().and_then(|e| e.downcast_ref::<DomainError>()) {
        error!(
            code = %err.code(),
            status = err.status().as_u16(),
            "{}",
            err.message()
        );
    }
    result
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
