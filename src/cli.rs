//! CLI domain: parse, route, and output.

mod output;
mod parse;
mod route;

pub use output::{format_set_json, format_set_table, format_set_text, map_error};
pub use parse::{Cli, Commands};
pub use route::RunContext;
