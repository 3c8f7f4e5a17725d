//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `smarthome.toml` in the working directory, or the file named by
//! `SMARTHOME_CONFIG`. Every field has a default so the file is optional.
//! Environment variables take precedence over file values.

use std::time::Duration;

use serde::Deserialize;
use smarthome_adapter_actuators::ActuatorsConfig;
use smarthome_adapter_mqtt::MqttConfig;

const DEFAULT_PATH: &str = "smarthome.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub home: HomeConfig,
    pub database: DatabaseConfig,
    pub mqtt: MqttConfig,
    pub logging: LoggingConfig,
    pub actuators: ActuatorsConfig,
}

/// Which tree to run and how long to wait on devices.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HomeConfig {
    /// Id of the root node in the `nodes` table.
    pub root_id: i64,
    /// How long a node waits for a device response, in seconds.
    pub request_timeout_secs: u64,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SMARTHOME_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("SMARTHOME_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("SMARTHOME_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(port) = var("SMARTHOME_MQTT_PORT").and_then(|val| val.parse().ok()) {
            self.mqtt.broker_port = port;
        }
        if let Some(id) = var("SMARTHOME_HOME_ID").and_then(|val| val.parse().ok()) {
            self.home.root_id = id;
        }
        if let Some(val) = var("SMARTHOME_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "database url must not be empty".to_string(),
            ));
        }
        if self.mqtt.broker_host.trim().is_empty() {
            return Err(ConfigError::Validation(
                "mqtt broker host must not be empty".to_string(),
            ));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt broker port must be non-zero".to_string(),
            ));
        }
        if self.home.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "request timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.home.request_timeout_secs)
    }
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            root_id: 1,
            request_timeout_secs: 5,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:smarthome.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "smarthomed=info,smarthome=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
