//! # configs
//!
//! Runtime settings for the sync-board binaries.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional)
//! 4. `SYNC_BOARD_*` environment variables, `__` between nested keys
//!    (`SYNC_BOARD_SYNC__POLICY=strict`)
//!
//! A `.env` file is loaded into the environment first if present.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use domains::SyncPolicy;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub search: SearchSettings,
    pub sync: SyncSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(deserialize_with = "secret_string")]
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    Memory,
    Elasticsearch,
}

#[derive(Debug, Deserialize)]
pub struct SearchSettings {
    pub backend: SearchBackend,
    pub url: String,
    pub index: String,
    pub username: Option<String>,
    #[serde(default, deserialize_with = "optional_secret_string")]
    pub password: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    pub policy: SyncPolicy,
    /// 0 disables the background reconciler.
    pub reconcile_interval_secs: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

fn secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret_string<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

/// Builder pre-filled with the defaults every deployment starts from.
pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("database.url", "sqlite://sync_board.db")?
        .set_default("database.max_connections", 5)?
        .set_default("search.backend", "memory")?
        .set_default("search.url", "http://localhost:9200")?
        .set_default("search.index", "boards")?
        .set_default("search.timeout_secs", 5)?
        .set_default("sync.policy", "best_effort")?
        .set_default("sync.reconcile_interval_secs", 30)?
        .set_default("sync.batch_size", 100)?
        .set_default("sync.max_attempts", 5)?
        .set_default("log.level", "info")?
        .set_default("log.format", "pretty")?)
}

impl Settings {
    /// Loads `.env`, the optional config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let builder = defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("SYNC_BOARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.batch_size == 0 {
            return Err(ConfigError::Invalid("sync.batch_size must be at least 1".into()));
        }
        if self.sync.max_attempts == 0 {
            return Err(ConfigError::Invalid("sync.max_attempts must be at least 1".into()));
        }
        if self.search.backend == SearchBackend::Elasticsearch && self.search.url.is_empty() {
            return Err(ConfigError::Invalid(
                "search.url is required for the elasticsearch backend".into(),
            ));
        }
        Ok(())
    }
}
