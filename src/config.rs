//! Application configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;
use tracing::warn;

use crate::{database::ActivityPolicy, errors::AisStoreError};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub database: DatabaseConfig,
    pub tiles: TilesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    pub uri: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub topics: Vec<String>,
    pub client_id: String,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://data/ais.db`
    pub url: String,
    /// Age after which messages are deleted
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_retention")]
    pub retention: Duration,
    /// Interval between deletions of old messages
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: Duration,
    #[serde(default)]
    pub activity_policy: ActivityPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TilesConfig {
    /// Directory holding the tile raster files
    pub directory: PathBuf,
}

fn default_mqtt_port() -> u16 {
    443
}

fn default_retention() -> Duration {
    Duration::from_secs(300)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("AISSTORE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("mqtt.topics"),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl DatabaseConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), AisStoreError> {
        self.validate_url()?;
        self.validate_durations()?;
        if let Some(dir) = self.path().as_deref().and_then(Path::parent) {
            if !dir.as_os_str().is_empty() {
                self.ensure_directory_exists(dir)?;
            }
        }
        Ok(())
    }

    /// File system path of a file database, None for in-memory databases
    pub fn path(&self) -> Option<PathBuf> {
        let path = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))
            .unwrap_or(&self.url);
        let path = path.split('?').next().unwrap_or_default();
        if path.is_empty() || path == ":memory:" {
            return None;
        }
        Some(PathBuf::from(path))
    }

    fn validate_url(&self) -> Result<(), AisStoreError> {
        if self.url.trim().is_empty() {
            return Err(AisStoreError::ConfigurationError {
                message: "Database URL cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    fn validate_durations(&self) -> Result<(), AisStoreError> {
        if self.retention.is_zero() {
            return Err(AisStoreError::ConfigurationError {
                message: "Retention must be greater than zero".to_string(),
            });
        }
        if self.sweep_interval.is_zero() {
            return Err(AisStoreError::ConfigurationError {
                message: "Sweep interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn ensure_directory_exists(&self, dir: &Path) -> Result<(), AisStoreError> {
        if !dir.exists() {
            warn!("Database directory does not exist, attempting to create it");
            std::fs::create_dir_all(dir).map_err(|e| AisStoreError::ConfigurationError {
                message: format!("Could not create database directory: {}", e),
            })?;
        }
        Ok(())
    }
}
