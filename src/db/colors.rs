use rusqlite::{params, OptionalExtension};
use tracing::warn;

use super::Database;
use crate::error::{Error, Result};
use crate::models::ColorPalette;
use crate::payload::NewPalette;

type PaletteRow = (i64, String, String, String);

fn palette_from_parts((id, name, raw, created_at): PaletteRow) -> ColorPalette {
    let colors = serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!("Unreadable color list for palette {}: {}", id, err);
        Vec::new()
    });
    ColorPalette {
        id,
        name,
        colors,
        created_at,
    }
}

impl Database {
    pub fn create_palette(&self, palette: &NewPalette) -> Result<ColorPalette> {
        let encoded = serde_json::to_string(&palette.colors)?;
        self.conn.execute(
            "INSERT INTO colors (name, color_palette) VALUES (?1, ?2)",
            params![palette.name, encoded],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_palette(id)?
            .ok_or_else(|| Error::not_found("color palette", id))
    }

    pub fn list_palettes(&self) -> Result<Vec<ColorPalette>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color_palette, created_at FROM colors ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<rusqlite::Result<Vec<PaletteRow>>>()?;
        Ok(rows.into_iter().map(palette_from_parts).collect())
    }

    pub fn get_palette(&self, id: i64) -> Result<Option<ColorPalette>> {
        let row: Option<PaletteRow> = self
            .conn
            .query_row(
                "SELECT id, name, color_palette, created_at FROM colors WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;
        Ok(row.map(palette_from_parts))
    }

    pub fn delete_palette(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM colors WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::not_found("color palette", id));
        }
        Ok(())
    }
}
