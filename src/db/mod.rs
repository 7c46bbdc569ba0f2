mod analytics;
mod colors;
mod files;
mod reactions;
mod tags;

pub use files::InsertOutcome;

use std::fs;
use std::path::Path;

use rusqlite::{ffi, Connection, ErrorCode};
use tracing::debug;

use crate::error::{Error, Result};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                debug!("Creating database directory: {}", parent.display());
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }

        let conn = Connection::open(path)?;

        // Performance Pragmas
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA cache_size = -64000;", // 64MB cache
        )?;
        debug!("Opened database at {}", path.display());

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create every table and index. Safe to run against an existing store.
    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("Database schema ready");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        constraint_code(err),
        Some(ffi::SQLITE_CONSTRAINT_UNIQUE) | Some(ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    constraint_code(err) == Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

/// Translate the constraint failures of an insert that references a file.
pub(crate) fn file_insert_error(err: rusqlite::Error, file_id: i64, conflict: &str) -> Error {
    if is_unique_violation(&err) {
        Error::Conflict(conflict.to_string())
    } else if is_foreign_key_violation(&err) {
        Error::not_found("file", file_id)
    } else {
        Error::Database(err)
    }
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
