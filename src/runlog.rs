use crate::types::timestamp;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-run log file. Every line is also emitted as a `tracing` event.
///
/// Each write opens the file in append mode, so the serving thread and the foreground
/// thread can both log without sharing a handle.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// `server_<unix seconds>.log` inside `dir`.
    pub fn in_dir(dir: &Path, started: chrono::DateTime<chrono::Local>) -> Self {
        Self {
            path: dir.join(format!("server_{}.log", started.timestamp())),
        }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn write(&self, message: &str) {
        tracing::info!("{}", message);
        let line = format!("[{}] {}\n", timestamp(), message);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(e) = result {
            tracing::warn!("Could not append to {}: {}", self.path.display(), e);
        }
    }
}
