//! The index document: a fixed shell with two JSON injection points.

use crate::output::embed_json;
use crate::{ServeError, Snapshot};
use std::fs;
use std::path::PathBuf;

pub const META_PLACEHOLDER: &str = r#"<script id="meta-json" type="application/json"></script>"#;
pub const FILES_PLACEHOLDER: &str = r#"<script id="files-json" type="application/json"></script>"#;

const BUNDLED_SHELL: &str = include_str!("../assets/index.html");

/// Where the document shell comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    Bundled,
    Template(PathBuf),
}

impl PageSource {
    pub fn from_template(template: Option<PathBuf>) -> Self {
        match template {
            Some(path) => PageSource::Template(path),
            None => PageSource::Bundled,
        }
    }
}

/// Renders the index page. Never fails: problems produce a small error document.
pub fn render_page(source: &PageSource, snapshot: &Snapshot) -> String {
    let shell = match source {
        PageSource::Bundled => BUNDLED_SHELL.to_string(),
        PageSource::Template(path) => match fs::read_to_string(path) {
            Ok(shell) => shell,
            Err(e) => {
                tracing::warn!("Template {} unavailable: {}", path.display(), e);
                return error_page(&format!("Template {} not found.", path.display()));
            }
        },
    };
    match fill_placeholders(&shell, snapshot) {
        Ok(page) => page,
        Err(e) => error_page(&e.to_string()),
    }
}

/// Replaces the two empty placeholder elements with the snapshot's metadata and files.
pub fn fill_placeholders(shell: &str, snapshot: &Snapshot) -> Result<String, ServeError> {
    let meta = format!(
        r#"<script id="meta-json" type="application/json">{}</script>"#,
        embed_json(&snapshot.meta)?
    );
    let files = format!(
        r#"<script id="files-json" type="application/json">{}</script>"#,
        embed_json(&snapshot.files)?
    );
    Ok(shell
        .replace(META_PLACEHOLDER, &meta)
        .replace(FILES_PLACEHOLDER, &files))
}

pub fn error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Error</title></head>\
         <body><h1>Error</h1><p>{}</p></body></html>",
        escape_html(message)
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
