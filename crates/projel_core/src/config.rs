//! Store configuration.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `log_dir`, when present, is absolute (same rule as `init_logging`).

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_STORAGE_KEY: &str = "projel-storage";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key of the persisted document.
    pub storage_key: String,
    /// SQLite file; `None` keeps state in an in-memory database.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// Rolling log directory; `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    BlankStorageKey,
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid store config: {err}"),
            Self::BlankStorageKey => write!(f, "storage_key cannot be empty"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::BlankStorageKey | Self::RelativeLogDir(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl StoreConfig {
    /// Parses and validates a JSON config.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::BlankStorageKey);
        }
        if let Some(dir) = self.log_dir.as_deref().filter(|dir| !dir.is_absolute()) {
            return Err(ConfigError::RelativeLogDir(dir.to_path_buf()));
        }
        Ok(())
    }
}
