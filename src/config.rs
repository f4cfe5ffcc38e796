//! Session configuration
//!
//! Read from `~/.nodle/session.json` when present. Every field is optional in the
//! file and falls back to its default.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hotswap::AdapterOptions;
use crate::logging::LogRecorderOptions;

const CONFIG_DIR: &str = ".nodle";
const CONFIG_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// `env_logger` filter directives, e.g. `"info,nodes=debug"`
    pub log_filter: String,
    pub recorder: LogRecorderOptions,
    pub adapter: AdapterOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            recorder: LogRecorderOptions::default(),
            adapter: AdapterOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Default location of the config file, if a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded session config from {}", path.display());
        Ok(config)
    }

    /// Load from the default location; defaults when no file exists there
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No session config found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(io_error)
    }
}
