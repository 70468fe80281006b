use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid ignore pattern: {0}")]
    Pattern(String),
    #[error("Not a directory: {0}")]
    InvalidRoot(PathBuf),
    #[error("Could not bind {addr}: {message}")]
    Bind { addr: String, message: String },
    #[error("Server is already running")]
    AlreadyRunning,
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not install interrupt handler: {0}")]
    Signal(String),
}
impl ServeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ServeError::Io {
            path: path.into(),
            source,
        }
    }
    /// Errors the user fixes by changing the invocation, not by retrying.
    pub fn is_config(&self) -> bool {
        matches!(self, ServeError::InvalidRoot(_) | ServeError::Pattern(_))
    }
}
