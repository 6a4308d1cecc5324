//! Configuration System
//!
//! Layered configuration built with the `config` crate. Precedence, lowest to
//! highest: built-in defaults, the global config file, an explicit config file,
//! then `MARKERS__*` environment variables (e.g. `MARKERS__STORE__MARKER_FILE`).

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkersConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the marker file lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_marker_file")]
    pub marker_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            marker_file: default_marker_file(),
        }
    }
}

/// `<data dir>/markers.json`, or `./markers.json` when no home directory is known.
pub fn default_marker_file() -> PathBuf {
    directories::ProjectDirs::from("", "", "markers")
        .map(|dirs| dirs.data_dir().join("markers.json"))
        .unwrap_or_else(|| PathBuf::from("markers.json"))
}

/// Path to the global config file, if a home directory can be determined.
pub fn global_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg).join("markers").join("config.toml"));
        }
    }
    std::env::var("HOME").ok().map(|home| {
        PathBuf::from(home)
            .join(".config")
            .join("markers")
            .join("config.toml")
    })
}

impl MarkersConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.store.marker_file.as_os_str().is_empty() {
            return Err(ApiError::ConfigError(
                "Marker file path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads [`MarkersConfig`] from all sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration, optionally layering an explicit file on top of the
    /// global one. An explicit file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<MarkersConfig, ApiError> {
        let mut builder = Config::builder().set_default(
            "store.marker_file",
            default_marker_file().to_string_lossy().to_string(),
        )?;

        if let Some(global) = global_config_path() {
            if global.exists() {
                debug!(config_path = %global.display(), "Using global config file");
                builder = builder.add_source(File::from(global).required(false));
            }
        }

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(Environment::with_prefix("MARKERS").separator("__"));

        let config: MarkersConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
