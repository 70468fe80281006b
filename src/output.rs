//! Serialization of a [`Snapshot`].
//!
//! Provides the JSON bodies served by the control API, the script-safe variant used
//! when JSON is embedded into an HTML page, and the flat text report.

use crate::{ServeError, Snapshot};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Width of the banner lines in the flat report.
const BANNER_WIDTH: usize = 80;
/// Stand-in for records without a text preview.
pub const NO_PREVIEW: &str = "[binary or omitted]";

/// Supported dump formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Report,
}

/// Formats the whole snapshot into a string.
pub fn format_snapshot(snapshot: &Snapshot, format: OutputFormat) -> Result<String, ServeError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(snapshot)?),
        OutputFormat::Report => format_report(snapshot),
    }
}

pub fn meta_json(snapshot: &Snapshot) -> Result<String, ServeError> {
    Ok(serde_json::to_string(&snapshot.meta)?)
}

pub fn files_json(snapshot: &Snapshot) -> Result<String, ServeError> {
    Ok(serde_json::to_string(&snapshot.files)?)
}

/// JSON that can sit inside a `<script>` element.
///
/// `</` is written as `<\/`, which is the same string to a JSON parser but can no
/// longer close the surrounding element.
pub fn embed_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ServeError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Flat report: the metadata as one JSON line, then per file a `=` banner, the path,
/// a `-` separator and the preview text.
pub fn format_report(snapshot: &Snapshot) -> Result<String, ServeError> {
    let mut lines = vec![meta_json(snapshot)?];
    let banner = "=".repeat(BANNER_WIDTH);
    let separator = "-".repeat(BANNER_WIDTH);
    for file in &snapshot.files {
        lines.push(format!("\n{}", banner));
        lines.push(format!("FILE: {}", file.path));
        lines.push(separator.clone());
        lines.push(file.text.clone().unwrap_or_else(|| NO_PREVIEW.to_string()));
    }
    Ok(lines.join("\n"))
}

/// Writes the report, creating parent directories as needed.
pub fn write_report(snapshot: &Snapshot, path: impl AsRef<Path>) -> Result<(), ServeError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ServeError::io(parent, e))?;
    }
    let content = format_report(snapshot)?;
    fs::write(path, content).map_err(|e| ServeError::io(path, e))?;
    Ok(())
}
