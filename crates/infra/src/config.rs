//! Service configuration.
//!
//! Sources, later ones winning: built-in defaults, an optional `docket.toml`
//! (or whatever `DOCKET_CONFIG` names) in the working directory, then `DOCKET_*`
//! environment variables (`DOCKET_BIND_ADDR`, `DOCKET_DATABASE_URL`, ...).

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocketConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Postgres URL. Without one the service runs on the in-memory store.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Seed the in-memory store with a demo catalog for company 1.
    #[serde(default = "default_seed_demo_catalog")]
    pub seed_demo_catalog: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_seed_demo_catalog() -> bool {
    true
}

impl Default for DocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_url: None,
            max_connections: default_max_connections(),
            log_filter: default_log_filter(),
            seed_demo_catalog: default_seed_demo_catalog(),
        }
    }
}

impl DocketConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let file = std::env::var("DOCKET_CONFIG").unwrap_or_else(|_| "docket".to_string());
        let config = Config::builder()
            .add_source(File::with_name(&file).required(false))
            .add_source(Environment::with_prefix("DOCKET").try_parsing(true))
            .build()?;
        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        let mut loaded: Self = config.try_deserialize()?;
        loaded.database_url = loaded.database_url.filter(|url| !url.trim().is_empty());
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be at least 1".into()));
        }
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_addr must not be empty".into()));
        }
        Ok(())
    }
}
