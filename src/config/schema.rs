//! Registry settings schema.
//!
//! All fields have defaults, so an empty or missing settings file yields the
//! stock behaviour.

use serde::Deserialize;
use std::time::Duration;

/// Settings for the tenant repository registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Base name of configuration resources (`<name>.xml`, `<name>.properties`, `<name>.toml`).
    pub config_name: String,

    /// Default per-tenant log file is `<home>/logs/<prefix><tenant>.log`.
    pub log_name_prefix: String,

    /// Config file poll interval in milliseconds.
    pub watch_interval_ms: u64,

    /// Root level for repositories built without a configuration.
    pub default_root_level: String,

    /// Rotation policy of the default tenant sink.
    pub default_sink: DefaultSinkConfig,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            config_name: "logging".to_string(),
            log_name_prefix: "mule-app-".to_string(),
            watch_interval_ms: 10_000,
            default_root_level: "info".to_string(),
            default_sink: DefaultSinkConfig::default(),
        }
    }
}

impl RegistrySettings {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }

    /// Conventional log file name for a tenant, e.g. `mule-app-orders.log`.
    pub fn tenant_log_name(&self, tenant: &str) -> String {
        format!("{}{}.log", self.log_name_prefix, tenant)
    }
}

/// Default tenant sink rotation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultSinkConfig {
    /// Roll when the file exceeds this many bytes.
    pub max_file_size: u64,

    /// Rolled files kept.
    pub max_backups: usize,
}

impl Default for DefaultSinkConfig {
    fn default() -> Self {
        Self {
            max_file_size: 1_000_000,
            max_backups: 100,
        }
    }
}
