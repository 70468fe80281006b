use crate::error::ServeError;
use crate::filter::IgnoreRules;
use crate::mime::guess_mime;
use crate::options::{BinaryDetection, CatalogOptions, LOG_DIR, SNIFF_BYTES};
use crate::types::{FileRecord, Snapshot};
use ignore::WalkBuilder;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
struct Walker {
    inner: ignore::Walk,
    root: PathBuf,
    rules: Arc<IgnoreRules>,
    excluded: Vec<PathBuf>,
}
/// A regular file that survived the ignore rules.
struct Candidate {
    path: PathBuf,
    relative: String,
}
impl Walker {
    fn new(root: PathBuf, options: &CatalogOptions) -> Result<Self, ServeError> {
        let rules = Arc::new(IgnoreRules::load(options)?);
        let mut builder = WalkBuilder::new(&root);
        builder
            .standard_filters(false)
            .hidden(!options.include_hidden)
            .max_depth(options.max_depth)
            .follow_links(options.follow_links);
        let prune = Arc::clone(&rules);
        let mut excluded = options.excluded.clone();
        excluded.push(root.join(LOG_DIR));
        let prune_excluded = excluded.clone();
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 || !entry.file_type().is_some_and(|t| t.is_dir()) {
                return true;
            }
            if is_excluded(entry.path(), &prune_excluded) {
                return false;
            }
            let name = entry.file_name().to_string_lossy();
            !prune.prunes_dir(&name)
        });
        Ok(Self {
            inner: builder.build(),
            root,
            rules,
            excluded,
        })
    }
    fn collect_candidates(self) -> Vec<Candidate> {
        let mut out = Vec::new();
        for result in self.inner {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.into_path();
            if is_excluded(&path, &self.excluded) {
                continue;
            }
            let Some(relative) = relative_path(&self.root, &path) else {
                continue;
            };
            if self.rules.skips_file(&relative) {
                continue;
            }
            out.push(Candidate { path, relative });
        }
        out
    }
}
fn is_excluded(path: &Path, excluded: &[PathBuf]) -> bool {
    excluded.iter().any(|e| path.starts_with(e))
}
/// Root-relative path joined with `/` whatever the platform separator.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
/// Whether a file is worth reading for a preview at all.
///
/// `text/*` files always qualify (the preview is truncated); anything else only when it
/// fits within `limit`.
pub fn is_text_candidate(mime: &str, size: u64, limit: u64) -> bool {
    mime.starts_with("text/") || size <= limit
}
/// Inspects the leading window of a file. Callers pass at most [`SNIFF_BYTES`] bytes.
pub fn looks_binary(head: &[u8], detection: BinaryDetection) -> bool {
    match detection {
        BinaryDetection::Simple => head.contains(&0),
        BinaryDetection::Accurate => content_inspector::inspect(head).is_binary(),
        BinaryDetection::None => false,
    }
}
fn read_text(
    path: &Path,
    binary_detection: BinaryDetection,
    limit: u64,
) -> Result<Option<String>, ServeError> {
    let file = File::open(path).map_err(|e| ServeError::io(path, e))?;
    let mut data = Vec::new();
    file.take(limit)
        .read_to_end(&mut data)
        .map_err(|e| ServeError::io(path, e))?;
    let head = &data[..data.len().min(SNIFF_BYTES)];
    if looks_binary(head, binary_detection) {
        tracing::debug!("Binary file detected: {}", path.display());
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&data).into_owned()))
}
fn build_record(candidate: &Candidate, options: &CatalogOptions) -> FileRecord {
    let size = match fs::metadata(&candidate.path) {
        Ok(metadata) => metadata.len(),
        Err(e) => {
            tracing::debug!("No metadata for {}: {}", candidate.path.display(), e);
            0
        }
    };
    let mime = guess_mime(&candidate.relative);
    let text = if is_text_candidate(mime, size, options.text_limit) {
        read_text(&candidate.path, options.binary_detection, options.text_limit)
            .unwrap_or_else(|e| {
                tracing::debug!("No preview: {}", e);
                None
            })
    } else {
        None
    };
    FileRecord {
        path: candidate.relative.clone(),
        size,
        mime: mime.to_string(),
        text,
    }
}
/// Resolves the catalog root to an absolute, existing directory.
pub fn resolve_root(root: &Path) -> Result<PathBuf, ServeError> {
    let resolved =
        fs::canonicalize(root).map_err(|_| ServeError::InvalidRoot(root.to_path_buf()))?;
    if !resolved.is_dir() {
        return Err(ServeError::InvalidRoot(root.to_path_buf()));
    }
    Ok(resolved)
}
/// Walks `options.root` and returns one record per eligible file, sorted by path.
///
/// Per-file failures never abort the walk: the file is listed without `text`.
pub fn catalog(options: &CatalogOptions) -> Result<Vec<FileRecord>, ServeError> {
    let root = resolve_root(&options.root)?;
    tracing::debug!("Cataloguing {}", root.display());
    let candidates = Walker::new(root, options)?.collect_candidates();
    #[cfg(not(feature = "parallel"))]
    let mut files: Vec<FileRecord> = candidates
        .iter()
        .map(|c| build_record(c, options))
        .collect();
    #[cfg(feature = "parallel")]
    let mut files: Vec<FileRecord> = candidates
        .par_iter()
        .map(|c| build_record(c, options))
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}
pub fn snapshot(options: &CatalogOptions) -> Result<Snapshot, ServeError> {
    let root = resolve_root(&options.root)?;
    let files = catalog(options)?;
    Ok(Snapshot::new(&root, files))
}
