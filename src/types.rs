use serde::{Deserialize, Serialize};
use std::path::Path;

/// One catalogued file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Root-relative path with `/` separators.
    pub path: String,
    /// Size on disk at scan time, in bytes.
    pub size: u64,
    /// Best-effort guess from the extension, `application/octet-stream` otherwise.
    pub mime: String,
    /// Decoded preview of the file.
    ///
    /// Absent for binary files, files too large to preview, and files that could not
    /// be read. Consumers should treat absence as "preview unavailable".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Aggregate information about one catalog pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub generated_at: String,
    pub root: String,
    pub file_count: usize,
    pub total_bytes: u64,
}

/// A catalog plus its metadata, built fresh for every response or report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    /// Sorted by `path`.
    pub files: Vec<FileRecord>,
}

impl Snapshot {
    pub fn new(root: &Path, files: Vec<FileRecord>) -> Self {
        let meta = SnapshotMeta {
            generated_at: timestamp(),
            root: root.display().to_string(),
            file_count: files.len(),
            total_bytes: files.iter().map(|f| f.size).sum(),
        };
        Self { meta, files }
    }
}

/// Local time as ISO-8601 with a numeric offset, e.g. `2026-10-18T09:15:02+0200`.
pub(crate) fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%z").to_string()
}
