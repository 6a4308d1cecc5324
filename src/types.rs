//! Shared type aliases.

use parking_lot::RwLock;
use std::sync::Arc;

/// Marker-set identifier. Unique within a store and never changed after creation.
pub type SetId = String;

/// One entry of the `markerSets` list in the marker file.
pub type Section = serde_json::Map<String, serde_json::Value>;

/// Shared handle to a record held by the store.
///
/// Handing out the same `Arc` for the same id is what makes `create` idempotent
/// by identity.
pub type RecordHandle<R> = Arc<RwLock<R>>;
