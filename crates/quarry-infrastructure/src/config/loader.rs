//! Configuration loader
//!
//! Merges configuration sources with figment. Later sources override
//! earlier ones: defaults, then the TOML file, then environment
//! variables such as `QUARRY_SYNC_WORKERS`.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::path::{Path, PathBuf};

use super::{AppConfig, CONFIG_ENV_PREFIX, DEFAULT_CONFIG_FILENAME};
use quarry_domain::error::{Error, Result};

/// Configuration loader service
#[derive(Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration file path
    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from all sources
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(AppConfig::default()));

        let path = self
            .config_path
            .clone()
            .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILENAME)));
        if let Some(path) = path {
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
                tracing::debug!(path = %path.display(), "configuration file merged");
            }
        }

        figment = figment.merge(Env::prefixed(&format!("{}_", CONFIG_ENV_PREFIX)).split("_"));

        let config: AppConfig = figment
            .extract()
            .map_err(|e| Error::invalid_input(format!("configuration error: {}", e)))?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// Write a configuration back out as TOML
    pub fn save_to_file<P: AsRef<Path>>(&self, config: &AppConfig, path: P) -> Result<()> {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| Error::internal(format!("config serialise failed: {}", e)))?;
        std::fs::write(path.as_ref(), rendered)
            .map_err(|e| Error::internal(format!("config write failed: {}", e)))
    }

    fn validate(config: &AppConfig) -> Result<()> {
        if config.sync.workers == 0 {
            return Err(Error::invalid_input("sync.workers must be at least 1"));
        }
        config.sync.interval()?;
        config.security.session_ttl()?;
        Ok(())
    }
}
