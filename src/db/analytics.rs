use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

use super::{file_insert_error, now, Database};
use crate::error::Result;
use crate::models::{AnalyticsRecord, SkipBucket, Subtype};

const ANALYTICS_COLUMNS: &str = "id, file_id, file_type, last_viewed, total_watch_time, \
     view_count, skips, scroll_up_count, scroll_down_count, created_at, updated_at";

/// Decode the stored skip list. Unreadable JSON is logged and read as empty.
pub(crate) fn decode_skips(record_id: i64, raw: Option<&str>) -> Vec<SkipBucket> {
    match raw {
        None => Vec::new(),
        Some(raw) if raw.trim().is_empty() => Vec::new(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|err| {
            warn!("Error parsing stored skips for analytics {}: {}", record_id, err);
            Vec::new()
        }),
    }
}

fn analytics_from_row(row: &Row<'_>) -> rusqlite::Result<AnalyticsRecord> {
    let id: i64 = row.get(0)?;
    let raw_skips: Option<String> = row.get(6)?;
    Ok(AnalyticsRecord {
        id,
        file_id: row.get(1)?,
        file_type: row.get(2)?,
        last_viewed: row.get(3)?,
        total_watch_time: row.get(4)?,
        view_count: row.get(5)?,
        skips: decode_skips(id, raw_skips.as_deref()),
        scroll_up_count: row.get(7)?,
        scroll_down_count: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Database {
    pub fn find_analytics(&self, file_id: i64, file_type: Subtype) -> Result<Option<AnalyticsRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ANALYTICS_COLUMNS} FROM analytics WHERE file_id = ?1 AND file_type = ?2"
                ),
                params![file_id, file_type],
                analytics_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// The analytics record of a file regardless of the type it was reported under.
    pub fn analytics_for_file(&self, file_id: i64) -> Result<Option<AnalyticsRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {ANALYTICS_COLUMNS} FROM analytics WHERE file_id = ?1 \
                     ORDER BY updated_at DESC, id DESC LIMIT 1"
                ),
                params![file_id],
                analytics_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Bump the view counter. Returns false when no record exists yet.
    pub(crate) fn increment_view_count(&self, file_id: i64, file_type: Subtype) -> Result<bool> {
        let stamp = now();
        let changed = self.conn.execute(
            "UPDATE analytics SET view_count = view_count + 1, last_viewed = ?1, updated_at = ?1 \
             WHERE file_id = ?2 AND file_type = ?3",
            params![stamp, file_id, file_type],
        )?;
        Ok(changed > 0)
    }

    pub(crate) fn insert_first_view(&self, file_id: i64, file_type: Subtype) -> Result<()> {
        let stamp = now();
        self.conn
            .execute(
                "INSERT INTO analytics (file_id, file_type, view_count, last_viewed, created_at, updated_at) \
                 VALUES (?1, ?2, 1, ?3, ?3, ?3)",
                params![file_id, file_type, stamp],
            )
            .map_err(|err| file_insert_error(err, file_id, "Analytics already recorded."))?;
        Ok(())
    }

    pub(crate) fn insert_analytics(
        &self,
        file_id: i64,
        file_type: Subtype,
        total_watch_time: f64,
        skips: &[SkipBucket],
        scroll_up_count: i64,
        scroll_down_count: i64,
    ) -> Result<()> {
        let stamp = now();
        let encoded = serde_json::to_string(skips)?;
        self.conn
            .execute(
                "INSERT INTO analytics (file_id, file_type, total_watch_time, skips, \
                 scroll_up_count, scroll_down_count, last_viewed, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)",
                params![
                    file_id,
                    file_type,
                    total_watch_time,
                    encoded,
                    scroll_up_count,
                    scroll_down_count,
                    stamp
                ],
            )
            .map_err(|err| file_insert_error(err, file_id, "Analytics already recorded."))?;
        Ok(())
    }

    /// Add the deltas to an existing record and replace its skip list.
    pub(crate) fn accumulate_analytics(
        &self,
        file_id: i64,
        file_type: Subtype,
        watch_time_delta: f64,
        skips: &[SkipBucket],
        scroll_up_delta: i64,
        scroll_down_delta: i64,
    ) -> Result<()> {
        let stamp = now();
        let encoded = serde_json::to_string(skips)?;
        self.conn.execute(
            "UPDATE analytics SET \
                 total_watch_time = total_watch_time + ?1, \
                 skips = ?2, \
                 scroll_up_count = scroll_up_count + ?3, \
                 scroll_down_count = scroll_down_count + ?4, \
                 last_viewed = ?5, \
                 updated_at = ?5 \
             WHERE file_id = ?6 AND file_type = ?7",
            params![
                watch_time_delta,
                encoded,
                scroll_up_delta,
                scroll_down_delta,
                stamp,
                file_id,
                file_type
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_skips_tolerates_garbage() {
        assert!(decode_skips(1, None).is_empty());
        assert!(decode_skips(1, Some("")).is_empty());
        assert!(decode_skips(1, Some("{not json")).is_empty());
        assert_eq!(
            decode_skips(1, Some(r#"[{"time":10,"count":2}]"#)),
            vec![SkipBucket { time: 10, count: 2 }]
        );
    }
}
