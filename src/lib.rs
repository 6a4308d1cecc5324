//! Markerstore: Reconciling File-Backed Marker Sets
//!
//! An in-memory collection of named marker sets kept in step with a JSON file
//! that other processes may also edit. `refresh` treats the file as ground
//! truth; `commit` merges external changes in before rewriting the file, and
//! never brings back a set that was removed locally.

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod marker;
pub mod record;
pub mod store;
pub mod types;

pub use error::{ApiError, FormatError, StorageError};
pub use marker::{Marker, MarkerSet, Position};
pub use record::Record;
pub use store::{CommitReport, MarkerStore, RefreshReport};
pub use types::{RecordHandle, Section, SetId};
