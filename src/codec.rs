//! Marker file codec
//!
//! The file is a JSON document `{"markerSets": [section, ...]}`. It is always
//! rewritten as a whole; nothing is patched in place.

use crate::error::StorageError;
use crate::types::Section;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Key of the top-level section list.
pub const SECTIONS_KEY: &str = "markerSets";

/// Make sure the marker file exists, writing an empty document if it does not.
pub fn ensure_exists(path: &Path) -> Result<(), StorageError> {
    if path.exists() {
        return Ok(());
    }
    debug!(path = %path.display(), "Marker file missing, creating empty document");
    write_document(path, Vec::new())
}

/// Read the marker file into its list of raw sections.
///
/// An empty file is an empty document. Entries that are not objects are kept
/// as-is so the caller can report and skip them.
pub fn read_document(path: &Path) -> Result<Vec<Value>, StorageError> {
    let text = fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let root: Value = serde_json::from_str(&text)
        .map_err(|e| StorageError::corrupt(path, format!("invalid JSON: {}", e)))?;
    let mut root = match root {
        Value::Object(map) => map,
        _ => return Err(StorageError::corrupt(path, "root is not an object")),
    };

    match root.remove(SECTIONS_KEY) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(sections)) => Ok(sections),
        Some(_) => Err(StorageError::corrupt(
            path,
            format!("'{}' is not a list", SECTIONS_KEY),
        )),
    }
}

/// Replace the marker file with a document holding `sections`.
///
/// Writes to a sibling temp file and renames it over the target.
pub fn write_document(path: &Path, sections: Vec<Section>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
    }

    let mut root = serde_json::Map::new();
    root.insert(
        SECTIONS_KEY.to_string(),
        Value::Array(sections.into_iter().map(Value::Object).collect()),
    );
    let serialized = serde_json::to_vec_pretty(&Value::Object(root)).map_err(|e| {
        StorageError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })?;

    let temp_path = temp_path_for(path);
    fs::write(&temp_path, &serialized).map_err(|e| StorageError::io(&temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StorageError::io(path, e)
    })?;

    Ok(())
}

fn temp_path_for(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
