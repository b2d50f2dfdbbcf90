//! Service configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is valid:
//!
//! ```toml
//! [dispatcher]
//! queue_capacity = 100
//! max_concurrency = 3
//! overflow = "reject"   # or "wait"
//!
//! [validation]
//! deadline_ms = 5000
//! ```

use crate::dispatcher::DispatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Shared deadline for both checks of one order.
    pub deadline_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { deadline_ms: 5000 }
    }
}

impl ValidationConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub dispatcher: DispatcherConfig,
    pub validation: ValidationConfig,
}

impl IntakeConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: IntakeConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatcher.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "dispatcher.queue_capacity must be greater than 0".into(),
            ));
        }
        if self.dispatcher.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "dispatcher.max_concurrency must be greater than 0".into(),
            ));
        }
        if self.validation.deadline_ms == 0 {
            return Err(ConfigError::Invalid(
                "validation.deadline_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
