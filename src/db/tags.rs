use rusqlite::{params, OptionalExtension, Row};

use super::{is_unique_violation, Database};
use crate::error::{Error, Result};
use crate::models::Tag;
use crate::payload::{NewTag, TagUpdate};

const DUPLICATE_TAG: &str = "A tag with this name already exists in the specified group.";

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        tag_group: row.get(2)?,
        color: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Database {
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, tag_group, color, created_at FROM tags ORDER BY name ASC",
        )?;
        let tags = stmt
            .query_map([], tag_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    pub fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        let tag = self
            .conn
            .query_row(
                "SELECT id, name, tag_group, color, created_at FROM tags WHERE id = ?1",
                params![id],
                tag_from_row,
            )
            .optional()?;
        Ok(tag)
    }

    pub fn create_tag(&self, tag: &NewTag) -> Result<Tag> {
        self.conn
            .execute(
                "INSERT INTO tags (name, tag_group, color) VALUES (?1, ?2, ?3)",
                params![tag.name, tag.tag_group, tag.color],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    Error::Conflict(DUPLICATE_TAG.to_string())
                } else {
                    Error::Database(err)
                }
            })?;
        let id = self.conn.last_insert_rowid();
        self.get_tag(id)?.ok_or_else(|| Error::not_found("tag", id))
    }

    /// Apply the fields present in `update`; absent fields keep their value.
    pub fn update_tag(&self, id: i64, update: &TagUpdate) -> Result<Tag> {
        let changed = self
            .conn
            .execute(
                "UPDATE tags SET name = COALESCE(?1, name), tag_group = COALESCE(?2, tag_group), \
                 color = COALESCE(?3, color) WHERE id = ?4",
                params![update.name, update.tag_group, update.color, id],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    Error::Conflict(DUPLICATE_TAG.to_string())
                } else {
                    Error::Database(err)
                }
            })?;
        if changed == 0 {
            return Err(Error::not_found("tag", id));
        }
        self.get_tag(id)?.ok_or_else(|| Error::not_found("tag", id))
    }

    /// Delete a tag along with its file associations.
    pub fn delete_tag(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("tag", id));
        }
        Ok(())
    }

    pub fn tag_file(&self, file_id: i64, tag_id: i64) -> Result<()> {
        if self.get_file(file_id)?.is_none() {
            return Err(Error::not_found("file", file_id));
        }
        if self.get_tag(tag_id)?.is_none() {
            return Err(Error::not_found("tag", tag_id));
        }

        self.conn
            .execute(
                "INSERT INTO file_tags (file_id, tag_id) VALUES (?1, ?2)",
                params![file_id, tag_id],
            )
            .map_err(|err| {
                if is_unique_violation(&err) {
                    Error::Conflict("This tag is already associated with the file.".to_string())
                } else {
                    Error::Database(err)
                }
            })?;
        Ok(())
    }

    pub fn untag_file(&self, file_id: i64, tag_id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM file_tags WHERE file_id = ?1 AND tag_id = ?2",
            params![file_id, tag_id],
        )?;
        if changed == 0 {
            return Err(Error::not_found("tag association", tag_id));
        }
        Ok(())
    }

    pub fn tag_ids_for_file(&self, file_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag_id FROM file_tags WHERE file_id = ?1 ORDER BY tag_id")?;
        let ids = stmt
            .query_map(params![file_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    pub fn tags_for_file(&self, file_id: i64) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name, t.tag_group, t.color, t.created_at \
             FROM tags t JOIN file_tags ft ON ft.tag_id = t.id \
             WHERE ft.file_id = ?1 ORDER BY t.name ASC",
        )?;
        let tags = stmt
            .query_map(params![file_id], tag_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Ids of every file carrying the tag.
    pub fn files_with_tag(&self, tag_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT file_id FROM file_tags WHERE tag_id = ?1 ORDER BY file_id")?;
        let ids = stmt
            .query_map(params![tag_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }
}
