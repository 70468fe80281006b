use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Files larger than this only get a text preview when their MIME type is `text/*`,
/// and previews are cut at this many bytes.
pub const DEFAULT_TEXT_LIMIT: u64 = 400_000;
/// Number of leading bytes inspected when deciding whether a file is binary.
pub const SNIFF_BYTES: usize = 4096;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
/// Log and report directory, relative to the served root. Never part of a catalog.
pub const LOG_DIR: &str = "_logs/_temp-server";
/// Directory names pruned from every walk, whatever the `.gitignore` says.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "venv",
    ".venv",
    "env",
    ".env",
    "build",
    "dist",
    "target",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".tox",
    ".idea",
    ".vscode",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryDetection {
    Simple,
    Accurate,
    None,
}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogOptions {
    pub root: PathBuf,
    pub respect_gitignore: bool,
    pub max_depth: Option<usize>,
    pub include_hidden: bool,
    pub follow_links: bool,
    pub ignore_patterns: Vec<String>,
    pub ignore_dirs: Vec<String>,
    pub text_limit: u64,
    pub binary_detection: BinaryDetection,
    /// Absolute paths (files or whole directories) never listed.
    pub excluded: Vec<PathBuf>,
}
impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            respect_gitignore: true,
            max_depth: None,
            include_hidden: false,
            follow_links: false,
            ignore_patterns: Vec::new(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| d.to_string()).collect(),
            text_limit: DEFAULT_TEXT_LIMIT,
            binary_detection: BinaryDetection::Simple,
            excluded: Vec::new(),
        }
    }
}
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    options: CatalogOptions,
}
impl CatalogBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            options: CatalogOptions {
                root: root.into(),
                ..Default::default()
            },
        }
    }
    pub fn respect_gitignore(mut self, yes: bool) -> Self {
        self.options.respect_gitignore = yes;
        self
    }
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = Some(depth);
        self
    }
    pub fn no_limit_depth(mut self) -> Self {
        self.options.max_depth = None;
        self
    }
    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.options.include_hidden = yes;
        self
    }
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.options.follow_links = yes;
        self
    }
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.options.ignore_patterns = patterns;
        self
    }
    pub fn ignore_dirs(mut self, names: Vec<String>) -> Self {
        self.options.ignore_dirs = names;
        self
    }
    pub fn text_limit(mut self, limit: u64) -> Self {
        self.options.text_limit = limit;
        self
    }
    pub fn binary_detection(mut self, method: BinaryDetection) -> Self {
        self.options.binary_detection = method;
        self
    }
    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.excluded.push(path.into());
        self
    }
    pub fn build(self) -> CatalogOptions {
        self.options
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeOptions {
    pub catalog: CatalogOptions,
    pub host: String,
    /// `0` asks the OS for a free port.
    pub port: u16,
    pub open_browser: bool,
    /// Leave the generated `index.html` in place on shutdown.
    pub keep_index: bool,
    pub write_index: bool,
    pub write_report: bool,
    /// User-supplied page with the two JSON placeholder elements.
    pub template: Option<PathBuf>,
}
impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            catalog: CatalogOptions::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            open_browser: false,
            keep_index: false,
            write_index: false,
            write_report: false,
            template: None,
        }
    }
}
#[derive(Debug, Default)]
pub struct ServeBuilder {
    options: ServeOptions,
}
impl ServeBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            options: ServeOptions {
                catalog: CatalogBuilder::new(root).build(),
                ..Default::default()
            },
        }
    }
    pub fn catalog(mut self, catalog: CatalogOptions) -> Self {
        self.options.catalog = catalog;
        self
    }
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.options.host = host.into();
        self
    }
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }
    pub fn open_browser(mut self, yes: bool) -> Self {
        self.options.open_browser = yes;
        self
    }
    pub fn keep_index(mut self, yes: bool) -> Self {
        self.options.keep_index = yes;
        self
    }
    pub fn write_index(mut self, yes: bool) -> Self {
        self.options.write_index = yes;
        self
    }
    pub fn write_report(mut self, yes: bool) -> Self {
        self.options.write_report = yes;
        self
    }
    pub fn template(mut self, path: Option<PathBuf>) -> Self {
        self.options.template = path;
        self
    }
    pub fn build(self) -> ServeOptions {
        self.options
    }
}
