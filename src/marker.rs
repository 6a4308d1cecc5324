//! Marker sets
//!
//! The record kind shipped with the store: a named, toggleable group of point
//! markers. Local edits are tracked so that a preserving load keeps them over
//! whatever the file says. A set that has never been loaded or saved is
//! entirely local: a preserving load validates the section but applies nothing.

use crate::error::FormatError;
use crate::record::Record;
use crate::types::{Section, SetId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

/// World position of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// JSON has no representation for infinities or NaN.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A single point marker inside a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub position: Position,
    #[serde(default)]
    pub map: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Marker {
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            position,
            map: String::new(),
            link: None,
        }
    }
}

/// A named set of markers.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    id: SetId,
    label: String,
    toggleable: bool,
    default_hidden: bool,
    markers: BTreeMap<String, Marker>,

    persisted: bool,
    fields_changed: bool,
    changed_markers: BTreeSet<String>,
    removed_markers: BTreeSet<String>,
}

/// Fully parsed section, applied only once everything in it is valid.
struct ParsedSection {
    label: Option<String>,
    toggleable: Option<bool>,
    default_hidden: Option<bool>,
    markers: Vec<Marker>,
}

impl MarkerSet {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.fields_changed = true;
    }

    pub fn is_toggleable(&self) -> bool {
        self.toggleable
    }

    pub fn set_toggleable(&mut self, toggleable: bool) {
        self.toggleable = toggleable;
        self.fields_changed = true;
    }

    pub fn is_default_hidden(&self) -> bool {
        self.default_hidden
    }

    pub fn set_default_hidden(&mut self, hidden: bool) {
        self.default_hidden = hidden;
        self.fields_changed = true;
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn marker(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id)
    }

    /// Insert or replace a marker. Markers with a non-finite position are rejected.
    pub fn put_marker(&mut self, marker: Marker) -> Result<(), FormatError> {
        if !marker.position.is_finite() {
            return Err(FormatError::NonFinitePosition(marker.id));
        }
        self.removed_markers.remove(&marker.id);
        self.changed_markers.insert(marker.id.clone());
        self.markers.insert(marker.id.clone(), marker);
        Ok(())
    }

    /// Remove a marker, remembering the removal until the next save.
    pub fn remove_marker(&mut self, id: &str) -> bool {
        if self.markers.remove(id).is_none() {
            return false;
        }
        self.changed_markers.remove(id);
        self.removed_markers.insert(id.to_string());
        true
    }

    /// True if anything was modified locally since the last load or save.
    pub fn has_unsaved_changes(&self) -> bool {
        !self.persisted
            || self.fields_changed
            || !self.changed_markers.is_empty()
            || !self.removed_markers.is_empty()
    }

    fn parse(section: &Section) -> Result<ParsedSection, FormatError> {
        let label = match section.get("label") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(FormatError::InvalidField {
                    field: "label",
                    expected: "a string",
                })
            }
        };
        let toggleable = optional_bool(section, "toggleable")?;
        let default_hidden = optional_bool(section, "defaultHide")?;

        let markers = match section.get("marker") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(index, entry)| {
                    serde_json::from_value::<Marker>(entry.clone()).map_err(|e| {
                        FormatError::InvalidMarker {
                            index,
                            reason: e.to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(FormatError::InvalidField {
                    field: "marker",
                    expected: "a list",
                })
            }
        };

        Ok(ParsedSection {
            label,
            toggleable,
            default_hidden,
            markers,
        })
    }
}

fn optional_bool(section: &Section, field: &'static str) -> Result<Option<bool>, FormatError> {
    match section.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(FormatError::InvalidField {
            field,
            expected: "a boolean",
        }),
    }
}

impl Record for MarkerSet {
    fn new(id: &str) -> Self {
        MarkerSet {
            id: id.to_string(),
            label: id.to_string(),
            toggleable: true,
            default_hidden: false,
            markers: BTreeMap::new(),
            persisted: false,
            fields_changed: false,
            changed_markers: BTreeSet::new(),
            removed_markers: BTreeSet::new(),
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn load_from(&mut self, section: &Section, overwrite: bool) -> Result<(), FormatError> {
        let parsed = Self::parse(section)?;
        if !overwrite && !self.persisted {
            return Ok(());
        }

        if overwrite || !self.fields_changed {
            self.label = parsed.label.unwrap_or_else(|| self.id.clone());
            self.toggleable = parsed.toggleable.unwrap_or(true);
            self.default_hidden = parsed.default_hidden.unwrap_or(false);
            self.fields_changed = false;
        }

        if overwrite {
            self.markers = parsed
                .markers
                .into_iter()
                .map(|m| (m.id.clone(), m))
                .collect();
            self.changed_markers.clear();
            self.removed_markers.clear();
            self.persisted = true;
        } else {
            // Drop markers the file no longer has, unless they were put locally.
            let in_file: BTreeSet<&str> =
                parsed.markers.iter().map(|m| m.id.as_str()).collect();
            let changed = &self.changed_markers;
            self.markers
                .retain(|id, _| in_file.contains(id.as_str()) || changed.contains(id));

            for marker in parsed.markers {
                if self.removed_markers.contains(&marker.id)
                    || self.changed_markers.contains(&marker.id)
                {
                    continue;
                }
                self.markers.insert(marker.id.clone(), marker);
            }
        }

        Ok(())
    }

    fn save_to(&self) -> Section {
        let mut section = Section::new();
        section.insert("id".to_string(), json!(self.id));
        section.insert("label".to_string(), json!(self.label));
        section.insert("toggleable".to_string(), json!(self.toggleable));
        section.insert("defaultHide".to_string(), json!(self.default_hidden));
        let markers: Vec<Value> = self
            .markers
            .values()
            .filter_map(|m| serde_json::to_value(m).ok())
            .collect();
        section.insert("marker".to_string(), Value::Array(markers));
        section
    }

    fn mark_saved(&mut self) {
        self.persisted = true;
        self.fields_changed = false;
        self.changed_markers.clear();
        self.removed_markers.clear();
    }
}

impl PartialEq for MarkerSet {
    /// Content equality; local change tracking is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.label == other.label
            && self.toggleable == other.toggleable
            && self.default_hidden == other.default_hidden
            && self.markers == other.markers
    }
}
