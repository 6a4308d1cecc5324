//! Record capability
//!
//! The store never looks inside a record. It only needs to construct an empty
//! one for an id, feed it a section read from the file, and ask it for a
//! section to write back.

use crate::error::FormatError;
use crate::types::Section;

/// A record kind that can live in a [`MarkerStore`](crate::store::MarkerStore).
pub trait Record: Send + Sync + 'static {
    /// Construct an empty record for `id`.
    fn new(id: &str) -> Self
    where
        Self: Sized;

    fn id(&self) -> &str;

    /// Populate or update this record from a section of the file.
    ///
    /// With `overwrite` set the section is authoritative. Without it the record
    /// may keep local modifications over conflicting file content.
    ///
    /// On `Err` the record must be left exactly as it was.
    fn load_from(&mut self, section: &Section, overwrite: bool) -> Result<(), FormatError>;

    /// Serialize this record into a fresh section. Must include `"id"`.
    fn save_to(&self) -> Section;

    /// Called once the record's content has been written to disk.
    fn mark_saved(&mut self) {}
}
