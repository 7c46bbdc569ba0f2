//! Copy files into the catalog root and index each copy.
//!
//! A batch never stops on one bad file: every source gets its own
//! `ImportResult`. Only an invalid destination folder or a store that stops
//! accepting writes fails the whole call.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::models::IndexStatus;
use crate::scanner::{normalize_path, relative_key};

/// Extensions accepted for import.
pub const IMPORT_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "mp3", "wav", "jpg", "jpeg", "png", "gif", "pdf", "txt",
];

pub fn is_importable(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMPORT_EXTENSIONS.contains(&ext.as_str()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Indexed,
    AlreadyExists,
    Failed,
}

impl From<IndexStatus> for ImportStatus {
    fn from(status: IndexStatus) -> Self {
        match status {
            IndexStatus::Indexed => ImportStatus::Indexed,
            IndexStatus::AlreadyExists => ImportStatus::AlreadyExists,
        }
    }
}

/// Outcome for one imported source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub source: String,
    /// Root-relative key of the copy, once it exists.
    pub path: Option<String>,
    pub size: Option<u64>,
    pub status: ImportStatus,
    pub file_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResult {
    fn failed(source: &Path, path: Option<String>, error: impl ToString) -> Self {
        Self {
            source: source.display().to_string(),
            path,
            size: None,
            status: ImportStatus::Failed,
            file_id: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ImportStatus::Failed
    }
}

impl Catalog {
    /// Copy `sources` into the root, or into `folder` below it, and index
    /// every copy. The destination folder is created and cataloged when
    /// missing so the copies link to it.
    pub fn import_files<P: AsRef<Path>>(
        &self,
        sources: &[P],
        folder: Option<&str>,
    ) -> Result<Vec<ImportResult>> {
        let root = normalize_path(&self.settings().root_directory);
        let target = match folder.map(str::trim).filter(|f| !f.is_empty()) {
            Some(folder) => normalize_path(&root.join(folder.trim_start_matches('/'))),
            None => root.clone(),
        };
        if relative_key(&root, &target).is_none() {
            return Err(Error::invalid(format!(
                "folder {} is outside the root directory",
                target.display()
            )));
        }

        fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        let parent_id = self.ensure_directory(&root, &target)?;

        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            let source = source.as_ref();
            match self.import_one(source, &target, parent_id) {
                Ok(result) => results.push(result),
                Err(err) if err.is_store_failure() => return Err(err),
                Err(err) => {
                    warn!("Failed to import {}: {}", source.display(), err);
                    let key = source
                        .file_name()
                        .and_then(|name| relative_key(&root, &target.join(name)));
                    results.push(ImportResult::failed(source, key, err));
                }
            }
        }

        let failed = results.iter().filter(|r| r.is_failed()).count();
        info!(
            "{} files imported, {} indexed successfully, {} failed",
            results.len(),
            results.len() - failed,
            failed
        );
        Ok(results)
    }

    /// Catalog `dir` and each of its ancestors below `root`, returning the
    /// id of `dir` (`None` for the root).
    fn ensure_directory(&self, root: &Path, dir: &Path) -> Result<Option<i64>> {
        if dir == root {
            return Ok(None);
        }
        let parent = match dir.parent() {
            Some(parent) => self.ensure_directory(root, parent)?,
            None => None,
        };
        let outcome = self.scanner().index_entry(dir, parent)?;
        Ok(Some(outcome.id))
    }

    fn import_one(
        &self,
        source: &Path,
        target: &Path,
        parent_id: Option<i64>,
    ) -> Result<ImportResult> {
        let name = source
            .file_name()
            .ok_or_else(|| Error::invalid(format!("{} has no file name", source.display())))?;
        if !is_importable(source) {
            return Err(Error::invalid("File type not supported"));
        }
        let metadata = fs::metadata(source).map_err(|e| Error::io(source, e))?;
        if !metadata.is_file() {
            return Err(Error::invalid(format!("{} is not a file", source.display())));
        }

        let dest: PathBuf = target.join(name);
        if normalize_path(source) != dest {
            fs::copy(source, &dest).map_err(|e| Error::io(&dest, e))?;
        }

        let scanner = self.scanner();
        let key = scanner.key_for(&dest)?;
        let outcome = scanner.index_entry(&dest, parent_id)?;
        Ok(ImportResult {
            source: source.display().to_string(),
            path: Some(key),
            size: Some(metadata.len()),
            status: outcome.status.into(),
            file_id: Some(outcome.id),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importable_extensions() {
        assert!(is_importable(Path::new("/tmp/clip.MP4")));
        assert!(is_importable(Path::new("notes.txt")));
        assert!(!is_importable(Path::new("archive.zip")));
        assert!(!is_importable(Path::new("README")));
    }

    #[test]
    fn test_failed_result_serializes_error() {
        let result = ImportResult::failed(Path::new("/tmp/a.zip"), None, "File type not supported");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "File type not supported");
        assert!(json["fileId"].is_null());
    }
}
