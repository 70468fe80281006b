//! # Tempserve
//!
//! `tempserve` exposes a project directory as a single browsable page. It walks the
//! directory, builds a snapshot of every eligible file (path, size, MIME type and a
//! text preview) and serves that snapshot, together with the directory itself, from a
//! small local HTTP server.
//!
//! The server answers a handful of JSON endpoints under `/__api__/`:
//!
//! | Method | Path         | Response                                   |
//! |--------|--------------|--------------------------------------------|
//! | GET    | `ping`       | `{"ok": true, "time": ...}`                |
//! | GET    | `meta`       | snapshot metadata                          |
//! | GET    | `files`      | snapshot file list                         |
//! | POST   | `refresh`    | rewrites the report, `{"ok", "url", "root"}` |
//! | POST   | `shutdown`   | `{"ok": true}`, then the server stops      |
//!
//! Snapshots are never cached: every request walks the directory again.
//!
//! # Features
//!
//! - `parallel`: builds file records in parallel using Rayon.
//!
//! # Example
//!
//! ```no_run
//! use tempserve::{CatalogBuilder, ServeBuilder, Session};
//!
//! let catalog = CatalogBuilder::new(".")
//!     .include_hidden(false)
//!     .ignore_patterns(vec!["*.lock".into()])
//!     .build();
//! let options = ServeBuilder::new(".")
//!     .catalog(catalog)
//!     .port(0)
//!     .write_report(true)
//!     .build();
//!
//! let mut session = Session::new(options).expect("invalid directory");
//! let url = session.start().expect("could not bind").to_string();
//! println!("Serving at {url}");
//! session.shutdown();
//! ```

mod engine;
mod error;
mod filter;
mod mime;
mod options;
pub mod output;
pub mod page;
mod runlog;
pub mod server;
mod session;
mod types;

pub use engine::{catalog, is_text_candidate, looks_binary, resolve_root, snapshot};
pub use error::ServeError;
pub use filter::{GitignorePattern, IgnoreRules, read_gitignore};
pub use mime::{FALLBACK_MIME, guess_mime};
pub use options::{
    BinaryDetection, CatalogBuilder, CatalogOptions, DEFAULT_HOST, DEFAULT_IGNORE_DIRS,
    DEFAULT_PORT, DEFAULT_TEXT_LIMIT, LOG_DIR, SNIFF_BYTES, ServeBuilder, ServeOptions,
};
pub use runlog::RunLog;
pub use session::{INDEX_FILE, REPORT_FILE, Session, SessionState, open_in_browser};
pub use types::{FileRecord, Snapshot, SnapshotMeta};
