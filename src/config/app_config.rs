use serde::Deserialize;
use url::Url;

use crate::infrastructure::storage::{PostgresConfig, StorageConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub storage: StorageSettings,
    pub logging: LoggingConfig,
}

/// Document database connection settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub name: String,
    /// Signing secret; carried along but unused by the repositories
    pub secret: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

pub const DEFAULT_DATABASE_NAME: &str = "valhalla";
pub const TEST_DATABASE_NAME: &str = "valhalla-test";

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: "valhalla".to_string(),
            password: String::new(),
            host: "localhost".to_string(),
            name: DEFAULT_DATABASE_NAME.to_string(),
            secret: String::new(),
            max_connections: 10,
            connect_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("name", &self.name)
            .field("secret", &"***")
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    /// Connection string for the configured database
    ///
    /// User and password are percent-encoded, so credentials may hold any
    /// character.
    pub fn connection_string(&self) -> Result<String, url::ParseError> {
        let mut url = Url::parse(&format!("postgres://{}", self.host))?;

        // only fails when the URL carries no host
        url.set_username(&self.user)
            .map_err(|_| url::ParseError::EmptyHost)?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| url::ParseError::EmptyHost)?;
        }
        url.set_path(&format!("/{}", self.name));

        Ok(url.into())
    }

    /// Same settings against the test database
    pub fn for_tests(&self) -> Self {
        Self {
            name: TEST_DATABASE_NAME.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Document store selected by the storage settings
    pub fn storage_config(&self) -> Result<StorageConfig, url::ParseError> {
        Ok(match self.storage.backend {
            StorageBackend::Memory => StorageConfig::in_memory(),
            StorageBackend::Postgres => StorageConfig::postgres(
                PostgresConfig::new(self.database.connection_string()?)
                    .with_max_connections(self.database.max_connections)
                    .with_connect_timeout(self.database.connect_timeout_secs),
            ),
        })
    }
}
