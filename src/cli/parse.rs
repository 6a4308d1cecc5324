//! CLI parse: clap types for the markers binary. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Markers CLI - inspect and edit a marker file
#[derive(Parser)]
#[command(name = "markers")]
#[command(about = "Inspect and edit a file-backed marker set store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Marker file (overrides the configured path)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// Configuration file path (layered over the global config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all marker sets
    List,
    /// Show one marker set
    Show {
        id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Create a marker set (no-op if it exists)
    Create {
        id: String,
        #[arg(long)]
        label: Option<String>,
    },
    /// Remove a marker set
    Remove { id: String },
    /// Add or replace a marker in a set
    AddMarker {
        set: String,
        id: String,
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        y: f64,
        #[arg(long, allow_hyphen_values = true)]
        z: f64,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        map: Option<String>,
        #[arg(long)]
        link: Option<String>,
    },
    /// Remove a marker from a set
    RemoveMarker { set: String, id: String },
    /// Reload the marker file and report what changed
    Refresh,
}
