use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{is_unique_violation, Database};
use crate::classify::classify;
use crate::error::{Error, Result};
use crate::models::{FileDetails, FileEntry, FileKind, NewFileEntry, Subtype};

const FILE_COLUMNS: &str =
    "id, path, type, subtype, parent_id, size, last_modified, created_at";

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileEntry> {
    Ok(FileEntry {
        id: row.get(0)?,
        path: row.get(1)?,
        kind: row.get(2)?,
        subtype: row.get(3)?,
        parent_id: row.get(4)?,
        size: row.get(5)?,
        last_modified: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Result of an insert against the unique `path` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    Duplicate,
}

impl Database {
    /// Id and stored type of the entry at a root-relative path.
    pub fn find_file_by_path(&self, path: &str) -> Result<Option<(i64, FileKind)>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, type FROM files WHERE path = ?1",
                params![path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(found)
    }

    /// Insert a new entry. A unique-key collision on `path` is reported as
    /// `Duplicate` rather than an error.
    pub fn insert_file(&self, file: &NewFileEntry) -> Result<InsertOutcome> {
        let inserted = self.conn.execute(
            "INSERT INTO files (path, type, subtype, parent_id, size, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                file.path,
                file.kind,
                file.subtype,
                file.parent_id,
                file.size,
                file.last_modified
            ],
        );

        match inserted {
            Ok(_) => Ok(InsertOutcome::Inserted(self.conn.last_insert_rowid())),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_file(&self, id: i64) -> Result<Option<FileEntry>> {
        let file = self
            .conn
            .query_row(
                &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
                params![id],
                file_from_row,
            )
            .optional()?;
        Ok(file)
    }

    pub fn list_files(&self) -> Result<Vec<FileEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FILE_COLUMNS} FROM files ORDER BY path"))?;
        let files = stmt
            .query_map([], file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Direct children of a directory, or the top-level entries for `None`.
    pub fn list_children(&self, parent_id: Option<i64>) -> Result<Vec<FileEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE parent_id IS ?1 ORDER BY path"
        ))?;
        let files = stmt
            .query_map(params![parent_id], file_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(files)
    }

    pub fn count_files(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Everything the player needs for one file.
    pub fn file_details(&self, id: i64) -> Result<FileDetails> {
        let file = self.get_file(id)?.ok_or_else(|| Error::not_found("file", id))?;

        let tags = self.tag_ids_for_file(id)?;
        let likes = self.likes_for_file(id)?;
        let dislikes = self.dislikes_for_file(id)?;
        let favorite = self.favorite_for_file(id)?;
        let analytics = self.analytics_for_file(id)?;

        Ok(FileDetails {
            file,
            tags,
            like_count: likes.len(),
            likes,
            dislikes,
            favorite,
            analytics,
        })
    }

    pub fn update_subtype(&self, id: i64, subtype: Subtype) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE files SET subtype = ?1 WHERE id = ?2",
            params![subtype, id],
        )?;
        if changed == 0 {
            return Err(Error::not_found("file", id));
        }
        Ok(())
    }

    /// Re-run the classifier over every stored entry, returning how many rows changed.
    pub fn reclassify_subtypes(&self, directory_subtype: Subtype) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut changed = 0;
        {
            let mut select = tx.prepare("SELECT id, path, type, subtype FROM files")?;
            let rows = select
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, FileKind>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut update = tx.prepare_cached("UPDATE files SET subtype = ?1 WHERE id = ?2")?;
            for (id, path, kind, stored) in rows {
                let subtype = match kind {
                    FileKind::Directory => directory_subtype,
                    FileKind::File => classify(&path),
                };
                if stored != subtype.as_str() {
                    update.execute(params![subtype, id])?;
                    changed += 1;
                }
            }
        }
        tx.commit()?;
        debug!("Reclassified {} entries", changed);
        Ok(changed)
    }

    /// Delete an entry; children and every record that references it cascade.
    pub fn delete_file(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM files WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("file", id));
        }
        Ok(())
    }
}
