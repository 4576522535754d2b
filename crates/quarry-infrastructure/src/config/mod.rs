//! Application configuration
//!
//! Typed configuration merged from defaults, an optional TOML file and
//! `QUARRY_`-prefixed environment variables.

mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use quarry_application::runtime::RuntimeCapabilities;
use quarry_domain::error::{Error, Result};

/// Environment variable prefix for overrides
pub const CONFIG_ENV_PREFIX: &str = "QUARRY";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "quarry.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub sync: SyncConfig,
    pub engine: EngineConfig,
    pub security: SecurityConfig,
}

impl AppConfig {
    /// Build the process-wide capability record this config implies
    pub fn runtime_capabilities(&self) -> Arc<RuntimeCapabilities> {
        Arc::new(RuntimeCapabilities::new(&self.security.session_backend))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter, e.g. "info" or "quarry_application=debug"
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json_format: bool,
    /// Optional file target for a daily-rolling copy of the logs
    pub file_output: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json_format: false,
            file_output: None,
        }
    }
}

/// Sync pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Parallel sync workers
    pub workers: usize,
    /// Interval of the seeded full-sync schedule, humantime format
    pub interval: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            interval: "60m".into(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Result<Duration> {
        parse_duration(&self.interval, "sync.interval")
    }
}

/// External search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub endpoint: String,
    /// Deploy the full embedded application package on connect
    pub dev_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".into(),
            dev_mode: false,
        }
    }
}

/// Security material configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Base64 master key for the SecretBox; generated when absent
    pub master_key: Option<String>,
    /// HMAC secret for session tokens; generated when absent
    pub jwt_secret: Option<String>,
    /// Session store backend name reported by the runtime
    pub session_backend: String,
    /// Session token lifetime, humantime format
    pub session_ttl: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            master_key: None,
            jwt_secret: None,
            session_backend: "memory".into(),
            session_ttl: "24h".into(),
        }
    }
}

impl SecurityConfig {
    pub fn session_ttl(&self) -> Result<Duration> {
        parse_duration(&self.session_ttl, "security.session_ttl")
    }
}

fn parse_duration(value: &str, key: &str) -> Result<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| Error::invalid_input(format!("{}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let config = AppConfig::default();
        assert_eq!(config.sync.workers, 4);
        assert_eq!(config.sync.interval().unwrap(), Duration::from_secs(3600));
        assert_eq!(
            config.security.session_ttl().unwrap(),
            Duration::from_secs(86400)
        );
    }

    #[test]
    fn bad_duration_is_invalid_input() {
        let config = SyncConfig {
            interval: "soon".into(),
            ..Default::default()
        };
        assert!(config.interval().is_err());
    }
}
