//! Formatting helpers for CLI output.

use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

/// Create a borderless table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Render a value as pretty-printed JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Print a value as pretty-printed JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", to_json(value)?);
    Ok(())
}

/// Shorten a container id to its first 12 characters.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Format a timestamp as a relative "ago" string; `-` when unknown.
pub fn format_ago(dt: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    let Some(dt) = dt else {
        return "-".to_string();
    };
    let secs = chrono::Utc::now().signed_duration_since(*dt).num_seconds();

    match secs {
        s if s < 0 => "just now".to_string(),
        s if s < 60 => format!("{s} seconds ago"),
        s if s < 3_600 => format!("{} minutes ago", s / 60),
        s if s < 86_400 => format!("{} hours ago", s / 3_600),
        s => format!("{} days ago", s / 86_400),
    }
}
