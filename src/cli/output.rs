//! CLI output: error mapping and marker set presentation.

use crate::error::ApiError;
use crate::marker::MarkerSet;
use crate::record::Record;
use comfy_table::Table;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    e.to_string()
}

/// Table of marker sets, one row per set.
pub fn format_set_table(sets: &[MarkerSet]) -> String {
    if sets.is_empty() {
        return "No marker sets.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["ID", "Label", "Markers", "Toggleable", "Hidden"]);
    for set in sets {
        table.add_row(vec![
            set.id().to_string(),
            set.label().to_string(),
            set.markers().count().to_string(),
            yes_no(set.is_toggleable()).to_string(),
            yes_no(set.is_default_hidden()).to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_set_text(set: &MarkerSet) -> String {
    let mut out = format!(
        "{} ({})\n  toggleable: {}\n  hidden by default: {}\n",
        set.id(),
        set.label(),
        yes_no(set.is_toggleable()),
        yes_no(set.is_default_hidden()),
    );
    for marker in set.markers() {
        out.push_str(&format!(
            "  - {} \"{}\" at ({}, {}, {})",
            marker.id, marker.label, marker.position.x, marker.position.y, marker.position.z
        ));
        if !marker.map.is_empty() {
            out.push_str(&format!(" on {}", marker.map));
        }
        if let Some(link) = &marker.link {
            out.push_str(&format!(" -> {}", link));
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

pub fn format_set_json(set: &MarkerSet) -> Result<String, ApiError> {
    serde_json::to_string_pretty(&serde_json::Value::Object(set.save_to()))
        .map_err(|e| ApiError::InvalidArgument(e.to_string()))
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
