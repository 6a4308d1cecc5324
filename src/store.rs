//! Marker Store
//!
//! Keeps the in-memory collection of records in step with the marker file.
//! Reads go straight to concurrent maps; `create`, `remove`, `refresh` and
//! `commit` are serialized by a single writer lock held for the whole
//! operation, file I/O included.
//!
//! Two reconcile passes share one implementation:
//! - destructive (`refresh`): the file is ground truth. Sets missing from the
//!   file are dropped and pending removals are forgotten.
//! - preserving (first half of `commit`): sets added or edited externally are
//!   merged in, but locally removed sets stay removed and sets only known in
//!   memory are kept.
//!
//! No OS-level file lock is taken; an external write landing between the read
//! and the write of a single `commit` is lost.

use crate::codec;
use crate::error::StorageError;
use crate::marker::MarkerSet;
use crate::record::Record;
use crate::types::{RecordHandle, SetId};
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Sets already in memory that were updated from the file.
    pub loaded: usize,
    /// Sets that were new to memory.
    pub added: usize,
    /// Sets dropped because the file no longer has them.
    pub removed: usize,
    /// Sections that could not be loaded.
    pub skipped: usize,
}

/// Outcome of a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Sections written to the file.
    pub written: usize,
    /// Sections read from the file and handed to a record before writing.
    /// A record may decide to apply nothing from its section.
    pub examined: usize,
    /// Sections in the file that could not be loaded.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcileMode {
    Destructive,
    Preserving,
}

/// File-backed store of records keyed by id.
pub struct MarkerStore<R: Record = MarkerSet> {
    path: PathBuf,
    records: DashMap<SetId, RecordHandle<R>>,
    tombstones: DashSet<SetId>,
    write_lock: Mutex<()>,
}

impl<R: Record> MarkerStore<R> {
    /// Open a store over `path`, loading the file as ground truth.
    ///
    /// The file (and its parent directories) is created if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let store = MarkerStore {
            path: path.as_ref().to_path_buf(),
            records: DashMap::new(),
            tombstones: DashSet::new(),
            write_lock: Mutex::new(()),
        };
        store.refresh()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the record for `id`, creating an empty one if there is none.
    ///
    /// Creating an id that was removed since the last reconcile cancels the
    /// pending removal.
    pub fn create(&self, id: &str) -> RecordHandle<R> {
        let _guard = self.write_lock.lock();

        if let Some(existing) = self.records.get(id).map(|r| r.value().clone()) {
            return existing;
        }

        let handle = Arc::new(RwLock::new(R::new(id)));
        self.tombstones.remove(id);
        self.records.insert(id.to_string(), handle.clone());
        debug!(set_id = id, "Created marker set");
        handle
    }

    /// Remove the record for `id`. Returns false if there was none.
    pub fn remove(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock();

        if self.records.remove(id).is_none() {
            return false;
        }
        self.tombstones.insert(id.to_string());
        debug!(set_id = id, "Removed marker set");
        true
    }

    pub fn get(&self, id: &str) -> Option<RecordHandle<R>> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Snapshot of all records, in no particular order.
    pub fn list(&self) -> Vec<RecordHandle<R>> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    /// Sorted ids of all records.
    pub fn ids(&self) -> Vec<SetId> {
        let mut ids: Vec<SetId> = self.records.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted ids removed locally and not yet reconciled with the file.
    pub fn pending_removals(&self) -> Vec<SetId> {
        let mut ids: Vec<SetId> = self.tombstones.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Reload from the file, discarding anything the file does not agree with.
    pub fn refresh(&self) -> Result<RefreshReport, StorageError> {
        let _guard = self.write_lock.lock();
        let report = self.reconcile_destructive()?;
        info!(
            path = %self.path.display(),
            loaded = report.loaded,
            added = report.added,
            removed = report.removed,
            skipped = report.skipped,
            "Refreshed marker sets"
        );
        Ok(report)
    }

    /// Merge in external changes, then write every record to the file.
    ///
    /// Records are written in id order. Every record stays write-locked from
    /// serialization until it is marked saved, so an edit made through a
    /// handle meanwhile lands after the commit instead of being marked saved
    /// without having been written.
    pub fn commit(&self) -> Result<CommitReport, StorageError> {
        let _guard = self.write_lock.lock();
        let merge = self.reconcile_preserving()?;

        let mut handles: Vec<(SetId, RecordHandle<R>)> = self
            .records
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));

        let mut records: Vec<RwLockWriteGuard<'_, R>> =
            handles.iter().map(|(_, h)| h.write()).collect();
        let sections = records.iter().map(|r| r.save_to()).collect();
        codec::write_document(&self.path, sections)?;

        for record in records.iter_mut() {
            record.mark_saved();
        }
        drop(records);
        self.tombstones.clear();

        let report = CommitReport {
            written: handles.len(),
            examined: merge.loaded + merge.added,
            skipped: merge.skipped,
        };
        info!(
            path = %self.path.display(),
            written = report.written,
            examined = report.examined,
            skipped = report.skipped,
            "Committed marker sets"
        );
        Ok(report)
    }

    fn reconcile_destructive(&self) -> Result<RefreshReport, StorageError> {
        self.reconcile(ReconcileMode::Destructive)
    }

    fn reconcile_preserving(&self) -> Result<RefreshReport, StorageError> {
        self.reconcile(ReconcileMode::Preserving)
    }

    /// Shared reconcile pass. Caller must hold the writer lock.
    ///
    /// Memory is only touched once the whole document has been read.
    fn reconcile(&self, mode: ReconcileMode) -> Result<RefreshReport, StorageError> {
        codec::ensure_exists(&self.path)?;
        let sections = codec::read_document(&self.path)?;

        let overwrite = mode == ReconcileMode::Destructive;
        let mut report = RefreshReport::default();
        let mut externally_removed: HashSet<SetId> =
            self.records.iter().map(|r| r.key().clone()).collect();
        let mut added_this_pass: HashSet<SetId> = HashSet::new();

        for (index, raw) in sections.into_iter().enumerate() {
            let section = match raw {
                Value::Object(section) => section,
                _ => {
                    debug!(index, "Skipping marker set section: not an object");
                    report.skipped += 1;
                    continue;
                }
            };
            let id = match section.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => {
                    debug!(index, "Skipping marker set section: no id defined");
                    report.skipped += 1;
                    continue;
                }
            };

            externally_removed.remove(&id);
            if mode == ReconcileMode::Preserving && self.tombstones.contains(&id) {
                debug!(set_id = %id, "Not restoring locally removed marker set");
                continue;
            }

            match self.records.get(&id).map(|r| r.value().clone()) {
                Some(handle) => {
                    // A duplicate of a set first seen in this pass replaces it.
                    let overwrite = overwrite || added_this_pass.contains(&id);
                    if let Err(e) = handle.write().load_from(&section, overwrite) {
                        warn!(set_id = %id, error = %e, "Failed to load marker set");
                        report.skipped += 1;
                        continue;
                    }
                    if !added_this_pass.contains(&id) {
                        report.loaded += 1;
                    }
                }
                None => {
                    let mut record = R::new(&id);
                    if let Err(e) = record.load_from(&section, true) {
                        warn!(set_id = %id, error = %e, "Failed to load marker set");
                        report.skipped += 1;
                        continue;
                    }
                    self.tombstones.remove(&id);
                    self.records
                        .insert(id.clone(), Arc::new(RwLock::new(record)));
                    added_this_pass.insert(id);
                    report.added += 1;
                }
            }
        }

        if mode == ReconcileMode::Destructive {
            for id in externally_removed {
                if self.records.remove(&id).is_some() {
                    debug!(set_id = %id, "Marker set removed externally");
                    report.removed += 1;
                }
            }
            self.tombstones.clear();
        }

        Ok(report)
    }
}

impl<R: Record> std::fmt::Debug for MarkerStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerStore")
            .field("path", &self.path)
            .field("records", &self.records.len())
            .field("tombstones", &self.tombstones.len())
            .finish()
    }
}
