//! Ignore rules applied while walking the served directory.
//!
//! Two independent glob sets are built. The directory set is matched against a
//! directory's own name and prunes the whole subtree. The file set is matched against
//! a file's root-relative path. `.gitignore` patterns feed both sets, except patterns
//! ending in `/`, which only ever name directories.

use crate::error::ServeError;
use crate::options::CatalogOptions;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub struct IgnoreRules {
    dirs: GlobSet,
    files: GlobSet,
}

/// A single usable `.gitignore` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitignorePattern {
    pub glob: String,
    pub dir_only: bool,
}

impl IgnoreRules {
    pub fn load(options: &CatalogOptions) -> Result<Self, ServeError> {
        let mut dirs = GlobSetBuilder::new();
        let mut files = GlobSetBuilder::new();
        for name in &options.ignore_dirs {
            dirs.add(Glob::new(&globset::escape(name)).map_err(|e| {
                ServeError::Pattern(format!("'{}': {}", name, e))
            })?);
        }
        if options.respect_gitignore {
            for pattern in read_gitignore(&options.root) {
                let glob = match Glob::new(&pattern.glob) {
                    Ok(glob) => glob,
                    Err(e) => {
                        tracing::warn!("Skipping .gitignore pattern '{}': {}", pattern.glob, e);
                        continue;
                    }
                };
                if !pattern.dir_only {
                    files.add(glob.clone());
                }
                dirs.add(glob);
            }
        }
        for pattern in &options.ignore_patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| ServeError::Pattern(format!("'{}': {}", pattern, e)))?;
            dirs.add(glob.clone());
            files.add(glob);
        }
        Ok(Self {
            dirs: dirs
                .build()
                .map_err(|e| ServeError::Pattern(format!("directory set: {}", e)))?,
            files: files
                .build()
                .map_err(|e| ServeError::Pattern(format!("file set: {}", e)))?,
        })
    }
    pub fn prunes_dir(&self, name: &str) -> bool {
        self.dirs.is_match(name)
    }
    pub fn skips_file(&self, relative: &str) -> bool {
        self.files.is_match(relative)
    }
}

/// Reads `<root>/.gitignore`. A missing or unreadable file yields no patterns.
///
/// Negated patterns (`!keep.me`) are not supported and are dropped.
pub fn read_gitignore(root: &Path) -> Vec<GitignorePattern> {
    let path = root.join(".gitignore");
    let raw = match fs::read(&path) {
        Ok(raw) => raw,
        Err(e) => {
            if path.exists() {
                tracing::warn!("Could not read {}: {}", path.display(), e);
            }
            return Vec::new();
        }
    };
    String::from_utf8_lossy(&raw)
        .lines()
        .filter_map(parse_gitignore_line)
        .collect()
}

fn parse_gitignore_line(line: &str) -> Option<GitignorePattern> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }
    let dir_only = line.ends_with('/');
    let glob = line.trim_start_matches('/').trim_end_matches('/');
    if glob.is_empty() {
        return None;
    }
    Some(GitignorePattern {
        glob: glob.to_string(),
        dir_only,
    })
}

