use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::classify::classify;
use crate::db::{Database, InsertOutcome};
use crate::error::{Error, Result};
use crate::models::{FileKind, IndexOutcome, IndexStatus, NewFileEntry, ScanSummary, Subtype};

/// Absolute, lexically normalized form of `path` (no `.` or `..` segments).
/// Symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Key of `full` under `root`: forward slashes with a leading `/`.
/// Returns `None` when `full` is not inside `root`.
pub fn relative_key(root: &Path, full: &Path) -> Option<String> {
    let rest = full.strip_prefix(root).ok()?;
    let segments: Vec<String> = rest
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/{}", segments.join("/")))
}

/// Indexes a directory tree into the `files` table.
///
/// Every entry is keyed by its root-relative path, so running the scanner
/// again over the same tree inserts only what is new.
pub struct Scanner<'a> {
    db: &'a Database,
    root: PathBuf,
    directory_subtype: Subtype,
    excluded: HashSet<PathBuf>,
}

impl<'a> Scanner<'a> {
    pub fn new(db: &'a Database, root: impl AsRef<Path>) -> Self {
        Self {
            db,
            root: normalize_path(root.as_ref()),
            directory_subtype: Subtype::Text,
            excluded: HashSet::new(),
        }
    }

    /// Subtype stored for directories, which have no extension to classify.
    pub fn with_directory_subtype(mut self, subtype: Subtype) -> Self {
        self.directory_subtype = subtype;
        self
    }

    /// Paths the walk must never index, such as the catalog's own database.
    pub fn with_excluded<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.excluded
            .extend(paths.into_iter().map(|p| normalize_path(p.as_ref())));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.contains(&normalize_path(path))
    }

    /// Root-relative key for a path strictly under the root. The root itself
    /// has no row; top-level entries carry no parent instead.
    pub fn key_for(&self, full_path: &Path) -> Result<String> {
        let normalized = normalize_path(full_path);
        match relative_key(&self.root, &normalized) {
            Some(key) if key == "/" => Err(Error::invalid(format!(
                "{} is the root directory itself",
                normalized.display()
            ))),
            Some(key) => Ok(key),
            None => Err(Error::invalid(format!(
                "{} is outside the root directory {}",
                normalized.display(),
                self.root.display()
            ))),
        }
    }

    /// Index a single file or directory (not its contents).
    pub fn index_entry(&self, full_path: &Path, parent_id: Option<i64>) -> Result<IndexOutcome> {
        let key = self.key_for(full_path)?;

        if let Some((id, kind)) = self.db.find_file_by_path(&key)? {
            debug!("Path already exists, continuing scan: {}", key);
            return Ok(IndexOutcome {
                id,
                status: IndexStatus::AlreadyExists,
                kind,
            });
        }

        let metadata = fs::metadata(full_path).map_err(|e| Error::io(full_path, e))?;
        let kind = if metadata.is_dir() {
            FileKind::Directory
        } else {
            FileKind::File
        };
        let subtype = match kind {
            FileKind::Directory => self.directory_subtype,
            FileKind::File => classify(full_path),
        };
        let last_modified = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339());

        let entry = NewFileEntry {
            path: key,
            kind,
            subtype,
            parent_id,
            size: (!kind.is_dir()).then(|| metadata.len() as i64),
            last_modified,
        };

        match self.db.insert_file(&entry)? {
            InsertOutcome::Inserted(id) => {
                info!("Indexed: {} ({})", entry.path, subtype);
                Ok(IndexOutcome {
                    id,
                    status: IndexStatus::Indexed,
                    kind,
                })
            }
            // Another pass inserted it between our lookup and insert
            InsertOutcome::Duplicate => {
                let (id, kind) = self
                    .db
                    .find_file_by_path(&entry.path)?
                    .ok_or_else(|| Error::invalid(format!("{} vanished during indexing", entry.path)))?;
                Ok(IndexOutcome {
                    id,
                    status: IndexStatus::AlreadyExists,
                    kind,
                })
            }
        }
    }

    /// Index everything under the root.
    pub fn index_tree(&self) -> Result<ScanSummary> {
        let root = self.root.clone();
        self.index_subtree(&root, None)
    }

    /// Index everything below `dir`, whose own entry has id `parent_id`
    /// (`None` for the root).
    ///
    /// The walk is depth-first and sequential: a directory is stored before
    /// any of its children, and `parents[d - 1]` holds the id every entry at
    /// depth `d` links to. Failures are logged and skip only the failing
    /// entry's subtree. A store that stops accepting writes (read-only,
    /// full, disconnected) ends the walk with an error.
    pub fn index_subtree(&self, dir: &Path, parent_id: Option<i64>) -> Result<ScanSummary> {
        let mut summary = ScanSummary::default();
        let mut parents: Vec<Option<i64>> = vec![parent_id];

        let mut walker = WalkDir::new(dir)
            .min_depth(1)
            .follow_links(false)
            .into_iter();

        while let Some(next) = walker.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    warn!("Cannot read {}: {}", path, err);
                    summary.failed += 1;
                    continue;
                }
            };

            let depth = entry.depth();
            let is_walk_dir = entry.file_type().is_dir();

            if self.is_excluded(entry.path()) {
                debug!("Skipping excluded path {}", entry.path().display());
                if is_walk_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            parents.truncate(depth);
            let parent = parents.get(depth - 1).copied().flatten();

            match self.index_entry(entry.path(), parent) {
                Ok(outcome) => {
                    summary.record(&outcome);
                    if is_walk_dir {
                        parents.push(Some(outcome.id));
                    }
                }
                Err(err) if err.is_store_failure() => {
                    error!("Store failure while indexing {}: {}", entry.path().display(), err);
                    return Err(err);
                }
                Err(err) => {
                    warn!("Failed to index {}: {}", entry.path().display(), err);
                    summary.failed += 1;
                    if is_walk_dir {
                        walker.skip_current_dir();
                    }
                }
            }
        }

        info!(
            "Indexing of {} complete: {} indexed, {} already present, {} failed",
            dir.display(),
            summary.indexed,
            summary.already_indexed,
            summary.failed
        );
        Ok(summary)
    }
}
