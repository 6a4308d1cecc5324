//! Shared helpers for integration tests

use markerstore::{MarkerSet, MarkerStore};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn marker_path(dir: &TempDir) -> PathBuf {
    dir.path().join("markers.json")
}

pub fn open(path: &Path) -> MarkerStore<MarkerSet> {
    MarkerStore::open(path).unwrap()
}

/// Overwrite the marker file as another process would.
pub fn write_external(path: &Path, sections: Vec<Value>) {
    let doc = json!({ "markerSets": sections });
    fs::write(path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();
}

/// Ids of the sections currently in the marker file, in file order.
pub fn file_ids(path: &Path) -> Vec<String> {
    let doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    doc["markerSets"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s["id"].as_str().map(str::to_string))
        .collect()
}

/// The section with `id` from the marker file.
pub fn file_section(path: &Path, id: &str) -> Option<Value> {
    let doc: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    doc["markerSets"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["id"] == id)
        .cloned()
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
