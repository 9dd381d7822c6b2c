//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, DatabaseConfig, LogFormat, LoggingConfig, StorageBackend, StorageSettings,
    DEFAULT_DATABASE_NAME, TEST_DATABASE_NAME,
};
