//! Integration tests for refresh/commit reconciliation against the marker file

use super::test_utils::{file_ids, file_section, ids, marker_path, open, write_external};
use markerstore::{Marker, MarkerSet, Position, Record};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

/// Empty store over a missing file, create, commit, reopen.
#[test]
fn test_create_commit_reopen_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    store.create("spawn");
    store.commit().unwrap();
    assert_eq!(file_ids(&path), ids(&["spawn"]));

    let reopened = open(&path);
    reopened.refresh().unwrap();
    let listed = reopened.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].read().id(), "spawn");
}

/// File {A, B}, memory {B, C}: refresh leaves exactly {A, B}.
#[test]
fn test_refresh_is_file_authoritative() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    store.create("B").write().set_label("local B");
    store.create("C");
    store.create("D");
    store.remove("D");
    assert_eq!(store.pending_removals(), ids(&["D"]));

    write_external(
        &path,
        vec![
            json!({"id": "A", "label": "file A"}),
            json!({"id": "B", "label": "file B"}),
            json!({"id": "D"}),
        ],
    );
    let report = store.refresh().unwrap();

    assert_eq!(store.ids(), ids(&["A", "B", "D"]));
    assert_eq!(store.get("B").unwrap().read().label(), "file B");
    assert!(store.pending_removals().is_empty());
    assert_eq!(report.loaded, 1);
    assert_eq!(report.added, 2);
    assert_eq!(report.removed, 1);
}

/// A set added to the file by someone else survives our commit.
#[test]
fn test_commit_preserves_external_addition() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    store.create("B");
    store.commit().unwrap();

    write_external(
        &path,
        vec![json!({"id": "B"}), json!({"id": "D", "label": "external"})],
    );
    store.commit().unwrap();

    assert_eq!(file_ids(&path), ids(&["B", "D"]));
    assert_eq!(store.get("D").unwrap().read().label(), "external");
}

/// An external edit to a set we never touched is kept on commit.
#[test]
fn test_commit_preserves_external_edit_to_untouched_set() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    store.create("B");
    store.create("mine");
    store.commit().unwrap();

    write_external(
        &path,
        vec![
            json!({"id": "B", "label": "edited elsewhere"}),
            json!({"id": "mine"}),
        ],
    );
    store.get("mine").unwrap().write().set_label("edited here");
    store.commit().unwrap();

    assert_eq!(file_section(&path, "B").unwrap()["label"], "edited elsewhere");
    assert_eq!(file_section(&path, "mine").unwrap()["label"], "edited here");
}

/// A marker deleted externally from a set we never touched stays deleted.
#[test]
fn test_commit_preserves_external_marker_removal() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    store
        .create("B")
        .write()
        .put_marker(Marker::new("m", Position::new(1.0, 2.0, 3.0)))
        .unwrap();
    store.create("mine");
    store.commit().unwrap();

    write_external(
        &path,
        vec![json!({"id": "B", "marker": []}), json!({"id": "mine"})],
    );
    store.get("mine").unwrap().write().set_label("edited here");
    store.commit().unwrap();

    assert!(store.get("B").unwrap().read().marker("m").is_none());
    assert_eq!(file_section(&path, "B").unwrap()["marker"], json!([]));
    assert_eq!(file_section(&path, "mine").unwrap()["label"], "edited here");
}

/// A rejected marker never reaches the file, so the set survives a reopen.
#[test]
fn test_non_finite_marker_does_not_corrupt_set() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    let towns = store.create("towns");
    assert!(towns
        .write()
        .put_marker(Marker::new("m", Position::new(f64::INFINITY, 0.0, 0.0)))
        .is_err());
    towns
        .write()
        .put_marker(Marker::new("ok", Position::new(0.0, 0.0, 0.0)))
        .unwrap();
    store.commit().unwrap();

    let reopened = open(&path);
    assert_eq!(reopened.ids(), ids(&["towns"]));
    reopened.create("other");
    reopened.commit().unwrap();
    assert_eq!(file_ids(&path), ids(&["other", "towns"]));
    assert!(file_section(&path, "towns").unwrap()["marker"][0]["position"]["x"].is_number());
}

/// Local removal wins over the file still holding the set.
#[test]
fn test_local_removal_wins_in_commit() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    store.create("X");
    store.create("Y");
    store.commit().unwrap();

    assert!(store.remove("X"));
    store.commit().unwrap();

    assert_eq!(file_ids(&path), ids(&["Y"]));
    assert!(!store.contains("X"));
    assert!(store.pending_removals().is_empty());
}

/// Removal wins even if another process re-created the set in the meantime.
#[test]
fn test_local_removal_wins_over_external_recreation() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    store.create("X");
    store.commit().unwrap();
    store.remove("X");

    write_external(&path, vec![json!({"id": "X", "label": "recreated"})]);
    store.commit().unwrap();

    assert!(file_ids(&path).is_empty());
    assert!(!store.contains("X"));
}

/// Sets created locally and not yet written are not mistaken for external removals.
#[test]
fn test_commit_keeps_unpersisted_local_sets() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    store.create("old");
    store.commit().unwrap();

    write_external(&path, vec![json!({"id": "old"}), json!({"id": "ext"})]);
    store.create("fresh");
    store.commit().unwrap();

    assert_eq!(file_ids(&path), ids(&["ext", "fresh", "old"]));
}

/// Commit followed by refresh gives back the same sets and content.
#[test]
fn test_commit_then_refresh_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    {
        let towns = store.create("towns");
        let mut towns = towns.write();
        towns.set_label("Towns");
        towns.set_toggleable(false);
        let mut marker = Marker::new("capital", Position::new(10.5, 70.0, -200.0));
        marker.map = "world".to_string();
        marker.link = Some("/wiki/capital".to_string());
        towns.put_marker(marker).unwrap();
    }
    store.create("empty").write().set_default_hidden(true);
    store.create("gone");
    store.remove("gone");

    let snapshot = |store: &markerstore::MarkerStore<MarkerSet>| -> Vec<MarkerSet> {
        store
            .ids()
            .iter()
            .map(|id| store.get(id).unwrap().read().clone())
            .collect()
    };

    let before = snapshot(&store);
    store.commit().unwrap();
    store.refresh().unwrap();
    assert_eq!(snapshot(&store), before);

    let reopened = open(&path);
    assert_eq!(snapshot(&reopened), before);
}

/// A section without an id is skipped; the valid one is loaded.
#[test]
fn test_malformed_section_tolerated() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);
    write_external(
        &path,
        vec![
            json!({"label": "no id here"}),
            json!({"id": "valid"}),
            json!("not even an object"),
            json!({"id": 42}),
        ],
    );

    let store = open(&path);
    let report = store.refresh().unwrap();
    assert_eq!(store.ids(), ids(&["valid"]));
    assert_eq!(report.skipped, 3);
}

/// A set whose content is invalid is skipped without affecting the others.
#[test]
fn test_invalid_set_content_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);
    write_external(
        &path,
        vec![
            json!({"id": "bad", "marker": [{"id": "m", "position": "nowhere"}]}),
            json!({"id": "good", "marker": [{"id": "m", "position": {"x": 1, "y": 2, "z": 3}}]}),
        ],
    );

    let store = open(&path);
    assert_eq!(store.ids(), ids(&["good"]));
    let good = store.get("good").unwrap();
    assert_eq!(good.read().marker("m").unwrap().position.z, 3.0);
}

/// The missing file, and any missing parent directory, is created on open.
#[test]
fn test_open_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("a").join("b").join("markers.json");

    let store = open(&path);
    assert!(store.is_empty());
    assert!(path.exists());
    assert!(file_ids(&path).is_empty());
}

/// An empty file on disk is treated as an empty document.
#[test]
fn test_empty_file_loads_as_empty() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);
    fs::write(&path, "").unwrap();

    let store = open(&path);
    assert!(store.is_empty());
}

/// Commit fails when the target cannot be written, and the caller can retry.
#[test]
fn test_commit_surfaces_io_failure() {
    let temp_dir = TempDir::new().unwrap();
    let path = marker_path(&temp_dir);

    let store = open(&path);
    store.create("a");
    store.remove("a");

    // Replace the marker file with a directory so reading it fails.
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();
    assert!(matches!(
        store.commit(),
        Err(markerstore::StorageError::Io { .. })
    ));
    assert_eq!(store.pending_removals(), ids(&["a"]));

    fs::remove_dir(&path).unwrap();
    store.commit().unwrap();
    assert!(store.pending_removals().is_empty());
}
