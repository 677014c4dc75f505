//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub lot: LotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Billing clock and extension policy
#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    /// Remaining minutes at or below which a session is in warning
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold_minutes: i64,

    /// Largest extension accepted in a single call, in hours
    #[serde(default = "default_max_extension_hours")]
    pub max_extension_hours: f64,

    /// Period of the session monitor recomputation, in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

fn default_warning_threshold() -> i64 {
    15
}

fn default_max_extension_hours() -> f64 {
    5.0
}

fn default_tick_interval() -> u64 {
    1000
}

/// Defaults for sessions started by the binary
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Price per hour
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,

    /// Initial time limit in hours
    #[serde(default = "default_time_limit")]
    pub time_limit_hours: f64,

    /// Parking spot or zone identifier
    #[serde(default = "default_location")]
    pub location_id: String,

    /// Plate used when the logged-in user has none on file
    pub vehicle_plate: Option<String>,

    /// Starting balance for a user session
    #[serde(default = "default_initial_balance")]
    pub initial_balance: f64,
}

fn default_hourly_rate() -> f64 {
    50.0
}

fn default_time_limit() -> f64 {
    2.0
}

fn default_location() -> String {
    "zone-a-001".to_string()
}

fn default_initial_balance() -> f64 {
    1250.0
}

/// Key-value storage backend selection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Redis,
}

/// Identity storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Redis connection URL (only used with the redis backend)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Application prefix applied to every stored key
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_namespace() -> String {
    "parkapp".to_string()
}

/// Parking lot capacity, used for the occupancy summary
#[derive(Debug, Deserialize, Clone)]
pub struct LotConfig {
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

fn default_capacity() -> u32 {
    120
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("billing.warning_threshold_minutes", 15)?
            .set_default("billing.max_extension_hours", 5.0)?
            .set_default("billing.tick_interval_ms", 1000)?
            .set_default("session.hourly_rate", 50.0)?
            .set_default("session.time_limit_hours", 2.0)?
            .set_default("session.initial_balance", 1250.0)?
            .set_default("storage.backend", "memory")?
            .set_default("storage.namespace", "parkapp")?
            .set_default("lot.capacity", 120)?
            .set_default("logging.level", "info")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with PARKAPP_ prefix
            .add_source(
                Environment::with_prefix("PARKAPP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            warning_threshold_minutes: 15,
            max_extension_hours: 5.0,
            tick_interval_ms: 1000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hourly_rate: 50.0,
            time_limit_hours: 2.0,
            location_id: default_location(),
            vehicle_plate: None,
            initial_balance: 1250.0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            redis_url: default_redis_url(),
            namespace: default_namespace(),
        }
    }
}

impl Default for LotConfig {
    fn default() -> Self {
        Self { capacity: 120 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_billing_config() {
        let config = BillingConfig::default();
        assert_eq!(config.warning_threshold_minutes, 15);
        assert_eq!(config.max_extension_hours, 5.0);
        assert_eq!(config.tick_interval_ms, 1000);
    }

    #[test]
    fn test_storage_backend_deserialize() {
        let backend: StorageBackend = serde_json::from_str("\"redis\"").unwrap();
        assert_eq!(backend, StorageBackend::Redis);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"session": {"hourly_rate": 80.0}}"#).unwrap();
        assert_eq!(config.session.hourly_rate, 80.0);
        assert_eq!(config.session.time_limit_hours, 2.0);
        assert_eq!(config.storage.namespace, "parkapp");
        assert_eq!(config.lot.capacity, 120);
    }
}
