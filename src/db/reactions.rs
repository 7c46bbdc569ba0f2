use rusqlite::{params, OptionalExtension, Row};

use super::{file_insert_error, Database};
use crate::error::{Error, Result};
use crate::models::{Dislike, Favorite, Like, Reaction};

#[derive(Debug, Clone, Copy)]
enum ReactionTable {
    Likes,
    Dislikes,
}

impl ReactionTable {
    fn name(self) -> &'static str {
        match self {
            ReactionTable::Likes => "likes",
            ReactionTable::Dislikes => "dislikes",
        }
    }

    fn entity(self) -> &'static str {
        match self {
            ReactionTable::Likes => "like",
            ReactionTable::Dislikes => "dislike",
        }
    }
}

fn reaction_from_row(row: &Row<'_>) -> rusqlite::Result<Reaction> {
    Ok(Reaction {
        id: row.get(0)?,
        file_id: row.get(1)?,
        timestamp: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn favorite_from_row(row: &Row<'_>) -> rusqlite::Result<Favorite> {
    Ok(Favorite {
        id: row.get(0)?,
        file_id: row.get(1)?,
        timestamp: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl Database {
    fn add_reaction(&self, table: ReactionTable, file_id: i64, timestamp: i64) -> Result<Reaction> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} (file_id, timestamp) VALUES (?1, ?2)",
                    table.name()
                ),
                params![file_id, timestamp],
            )
            .map_err(|err| file_insert_error(err, file_id, "Reaction already recorded."))?;
        let id = self.conn.last_insert_rowid();

        let reaction = self.conn.query_row(
            &format!(
                "SELECT id, file_id, timestamp, created_at FROM {} WHERE id = ?1",
                table.name()
            ),
            params![id],
            reaction_from_row,
        )?;
        Ok(reaction)
    }

    fn reactions_for_file(&self, table: ReactionTable, file_id: i64) -> Result<Vec<Reaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, file_id, timestamp, created_at FROM {} \
             WHERE file_id = ?1 ORDER BY timestamp ASC, id ASC",
            table.name()
        ))?;
        let rows = stmt
            .query_map(params![file_id], reaction_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Delete by reaction id, returning the file it belonged to.
    fn remove_reaction(&self, table: ReactionTable, id: i64) -> Result<i64> {
        self.conn
            .query_row(
                &format!("DELETE FROM {} WHERE id = ?1 RETURNING file_id", table.name()),
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::not_found(table.entity(), id))
    }

    // ── Likes ────────────────────────────────────────────────────

    pub fn add_like(&self, file_id: i64, timestamp: i64) -> Result<Like> {
        self.add_reaction(ReactionTable::Likes, file_id, timestamp)
    }

    pub fn likes_for_file(&self, file_id: i64) -> Result<Vec<Like>> {
        self.reactions_for_file(ReactionTable::Likes, file_id)
    }

    pub fn remove_like(&self, id: i64) -> Result<i64> {
        self.remove_reaction(ReactionTable::Likes, id)
    }

    // ── Dislikes ─────────────────────────────────────────────────

    pub fn add_dislike(&self, file_id: i64, timestamp: i64) -> Result<Dislike> {
        self.add_reaction(ReactionTable::Dislikes, file_id, timestamp)
    }

    pub fn dislikes_for_file(&self, file_id: i64) -> Result<Vec<Dislike>> {
        self.reactions_for_file(ReactionTable::Dislikes, file_id)
    }

    pub fn remove_dislike(&self, id: i64) -> Result<i64> {
        self.remove_reaction(ReactionTable::Dislikes, id)
    }

    // ── Favorites ────────────────────────────────────────────────

    /// Mark a file as favorite. A file holds at most one favorite; a second
    /// request is rejected and the existing row is left untouched.
    pub fn add_favorite(&self, file_id: i64, timestamp: Option<i64>) -> Result<Favorite> {
        self.conn
            .execute(
                "INSERT INTO favorites (file_id, timestamp) VALUES (?1, ?2)",
                params![file_id, timestamp],
            )
            .map_err(|err| file_insert_error(err, file_id, "File is already marked as favorite."))?;

        self.favorite_for_file(file_id)?
            .ok_or_else(|| Error::not_found("favorite", file_id))
    }

    pub fn favorite_for_file(&self, file_id: i64) -> Result<Option<Favorite>> {
        let favorite = self
            .conn
            .query_row(
                "SELECT id, file_id, timestamp, created_at FROM favorites WHERE file_id = ?1",
                params![file_id],
                favorite_from_row,
            )
            .optional()?;
        Ok(favorite)
    }

    pub fn remove_favorite(&self, file_id: i64) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM favorites WHERE file_id = ?1",
            params![file_id],
        )?;
        if changed == 0 {
            return Err(Error::not_found("favorite", file_id));
        }
        Ok(())
    }
}
