//! CLI route: run context and command dispatch.

use crate::cli::output::{format_set_json, format_set_table, format_set_text};
use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, MarkersConfig};
use crate::error::ApiError;
use crate::marker::{Marker, MarkerSet, Position};
use crate::store::MarkerStore;
use std::path::PathBuf;
use tracing::info;

/// Runtime context for CLI execution: resolved config and the open store.
pub struct RunContext {
    config: MarkersConfig,
    store: MarkerStore<MarkerSet>,
}

impl RunContext {
    /// Load config and open the store. `file` overrides the configured marker file.
    pub fn new(file: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let mut config = ConfigLoader::load(config_path.as_deref())?;
        if let Some(file) = file {
            config.store.marker_file = file;
        }
        Self::with_config(config)
    }

    pub fn with_config(config: MarkersConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let store = MarkerStore::open(&config.store.marker_file)?;
        info!(path = %store.path().display(), sets = store.len(), "Marker store opened");
        Ok(Self { config, store })
    }

    pub fn config(&self) -> &MarkersConfig {
        &self.config
    }

    pub fn store(&self) -> &MarkerStore<MarkerSet> {
        &self.store
    }

    /// Execute a command and return its printable output.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::List => {
                let sets: Vec<MarkerSet> = self
                    .store
                    .ids()
                    .iter()
                    .filter_map(|id| self.store.get(id))
                    .map(|h| h.read().clone())
                    .collect();
                Ok(format_set_table(&sets))
            }
            Commands::Show { id, format } => {
                let handle = self
                    .store
                    .get(id)
                    .ok_or_else(|| ApiError::NotFound(id.clone()))?;
                let set = handle.read();
                match format.as_str() {
                    "json" => format_set_json(&set),
                    "text" => Ok(format_set_text(&set)),
                    other => Err(ApiError::InvalidArgument(format!(
                        "Unknown format '{}' (must be 'text' or 'json')",
                        other
                    ))),
                }
            }
            Commands::Create { id, label } => {
                let existed = self.store.contains(id);
                let handle = self.store.create(id);
                if let Some(label) = label {
                    handle.write().set_label(label.clone());
                }
                self.store.commit()?;
                Ok(if existed {
                    format!("Marker set '{}' already exists", id)
                } else {
                    format!("Created marker set '{}'", id)
                })
            }
            Commands::Remove { id } => {
                if !self.store.remove(id) {
                    return Err(ApiError::NotFound(id.clone()));
                }
                self.store.commit()?;
                Ok(format!("Removed marker set '{}'", id))
            }
            Commands::AddMarker {
                set,
                id,
                x,
                y,
                z,
                label,
                map,
                link,
            } => {
                let handle = self
                    .store
                    .get(set)
                    .ok_or_else(|| ApiError::NotFound(set.clone()))?;
                let mut marker = Marker::new(id.clone(), Position::new(*x, *y, *z));
                if let Some(label) = label {
                    marker.label = label.clone();
                }
                if let Some(map) = map {
                    marker.map = map.clone();
                }
                marker.link = link.clone();
                handle
                    .write()
                    .put_marker(marker)
                    .map_err(|e| ApiError::InvalidArgument(e.to_string()))?;
                self.store.commit()?;
                Ok(format!("Put marker '{}' in set '{}'", id, set))
            }
            Commands::RemoveMarker { set, id } => {
                let handle = self
                    .store
                    .get(set)
                    .ok_or_else(|| ApiError::NotFound(set.clone()))?;
                let removed = handle.write().remove_marker(id);
                if !removed {
                    return Err(ApiError::NotFound(format!("{}/{}", set, id)));
                }
                self.store.commit()?;
                Ok(format!("Removed marker '{}' from set '{}'", id, set))
            }
            Commands::Refresh => {
                let report = self.store.refresh()?;
                Ok(format!(
                    "{} sets: {} updated, {} added, {} removed, {} skipped",
                    self.store.len(),
                    report.loaded,
                    report.added,
                    report.removed,
                    report.skipped
                ))
            }
        }
    }
}
