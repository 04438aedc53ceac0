//! Configuration management
//!
//! Handles loading and saving the bkt configuration file. The file lives at
//! `$BKT_CONFIG_DIR/config.toml` when the variable is set, otherwise under the
//! platform config directory (`~/.config/bkt/config.toml` on Linux).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transfer::DEFAULT_WORKERS;

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "BKT_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub store: StoreSection,
}

/// Settings applied when no command-line flag overrides them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Concurrent transfers per batch
    pub workers: usize,

    /// Profile to read from the credentials file
    pub profile: String,

    /// AWS-style credentials file; `~/.aws/credentials` when unset
    pub credentials_file: Option<PathBuf>,

    pub region: String,

    /// Bucket addressing: auto, path or dns
    pub bucket_lookup: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            profile: "default".to_string(),
            credentials_file: None,
            region: "us-east-1".to_string(),
            bucket_lookup: "auto".to_string(),
        }
    }
}

/// Which store and bucket to talk to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

impl Config {
    /// Reject values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.defaults.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }

        if !matches!(self.defaults.bucket_lookup.as_str(), "auto" | "path" | "dns") {
            return Err(Error::Config(format!(
                "bucket_lookup must be 'auto', 'path' or 'dns', got '{}'",
                self.defaults.bucket_lookup
            )));
        }

        if let Some(endpoint) = &self.store.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("Invalid endpoint '{endpoint}': {e}")))?;
        }

        Ok(())
    }

    /// The credentials file to read, falling back to `~/.aws/credentials`
    pub fn credentials_file(&self) -> Option<PathBuf> {
        self.defaults
            .credentials_file
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")))
    }
}

/// Loads and saves [`Config`] on disk
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for the default config location
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Cannot determine config directory".to_string()))?
                .join("bkt"),
        };
        Ok(Self::with_path(dir.join(CONFIG_FILE_NAME)))
    }

    /// Manager for an explicit config file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config; a missing file yields the defaults
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config, creating its directory if needed
    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }
}
