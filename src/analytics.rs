use std::collections::HashMap;

use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{AnalyticsRecord, SkipBucket, Subtype};
use crate::payload::AnalyticsUpdate;

/// Default width of a skip bucket in seconds.
pub const DEFAULT_SKIP_BUCKET_SECS: i64 = 5;

/// Number of skip buckets kept per analytics record.
pub const MAX_SKIP_BUCKETS: usize = 10;

/// Round to the nearest multiple of `interval`, halves rounding up.
/// Results beyond the `i64` range saturate.
pub fn round_to(value: f64, interval: i64) -> i64 {
    let interval = interval.max(1) as f64;
    ((value / interval + 0.5).floor() * interval).clamp(i64::MIN as f64, i64::MAX as f64) as i64
}

/// Snap a like/dislike/favorite position to the nearest second.
pub fn round_timestamp(timestamp: f64) -> i64 {
    round_to(timestamp, 1)
}

/// Fold `incoming` raw skip times into `existing` buckets and keep the most
/// frequent ones: count descending, then time ascending.
pub fn merge_skips(existing: &[SkipBucket], incoming: &[f64], bucket_size: i64) -> Vec<SkipBucket> {
    let mut counts: HashMap<i64, i64> = HashMap::new();

    for bucket in existing {
        let count = counts
            .entry(round_to(bucket.time as f64, bucket_size))
            .or_default();
        *count = count.saturating_add(bucket.count);
    }

    for &time in incoming.iter().filter(|t| t.is_finite()) {
        let count = counts.entry(round_to(time, bucket_size)).or_default();
        *count = count.saturating_add(1);
    }

    let mut buckets: Vec<SkipBucket> = counts
        .into_iter()
        .map(|(time, count)| SkipBucket { time, count })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count).then(a.time.cmp(&b.time)));
    buckets.truncate(MAX_SKIP_BUCKETS);
    buckets
}

/// Count one view of a file, creating its analytics record on first view.
pub fn record_view(db: &Database, file_id: i64, file_type: Subtype) -> Result<AnalyticsRecord> {
    let tx = db.connection().unchecked_transaction()?;

    if !db.increment_view_count(file_id, file_type)? {
        debug!("No analytics for file {} yet, creating record", file_id);
        db.insert_first_view(file_id, file_type)?;
    }

    let record = db
        .find_analytics(file_id, file_type)?
        .ok_or_else(|| Error::not_found("analytics", file_id))?;
    tx.commit()?;
    Ok(record)
}

/// Add a watch-time / skip / scroll report to a file's running totals.
///
/// Without an existing record the report becomes the initial totals.
pub fn apply_update(
    db: &Database,
    update: &AnalyticsUpdate,
    bucket_size: i64,
) -> Result<AnalyticsRecord> {
    let tx = db.connection().unchecked_transaction()?;

    match db.find_analytics(update.file_id, update.file_type)? {
        Some(existing) => {
            let skips = merge_skips(&existing.skips, &update.skips, bucket_size);
            db.accumulate_analytics(
                update.file_id,
                update.file_type,
                update.total_watch_time,
                &skips,
                update.scroll_up_count,
                update.scroll_down_count,
            )?;
        }
        None => {
            let skips = merge_skips(&[], &update.skips, bucket_size);
            db.insert_analytics(
                update.file_id,
                update.file_type,
                update.total_watch_time,
                &skips,
                update.scroll_up_count,
                update.scroll_down_count,
            )?;
        }
    }

    let record = db
        .find_analytics(update.file_id, update.file_type)?
        .ok_or_else(|| Error::not_found("analytics", update.file_id))?;
    tx.commit()?;
    debug!(
        "Analytics for file {}: {:.1}s watched, {} skip buckets",
        record.file_id,
        record.total_watch_time,
        record.skips.len()
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(time: i64, count: i64) -> SkipBucket {
        SkipBucket { time, count }
    }

    #[test]
    fn test_merge_into_empty() {
        let merged = merge_skips(&[], &[12.0, 13.0, 9.0], 5);
        assert_eq!(merged, vec![bucket(10, 2), bucket(15, 1)]);
    }

    #[test]
    fn test_merge_adds_to_existing_bucket() {
        let merged = merge_skips(&[bucket(10, 5)], &[11.0], 5);
        assert_eq!(merged, vec![bucket(10, 6)]);
    }

    #[test]
    fn test_existing_times_are_re_rounded() {
        let merged = merge_skips(&[bucket(11, 2), bucket(9, 1)], &[], 5);
        assert_eq!(merged, vec![bucket(10, 3)]);
    }

    #[test]
    fn test_keeps_top_ten_with_time_tiebreak() {
        let incoming: Vec<f64> = (0..30).map(|i| (i * 5) as f64).collect();
        let mut incoming = incoming;
        incoming.extend([145.0, 145.0, 70.0]);

        let merged = merge_skips(&[], &incoming, 5);
        assert_eq!(merged.len(), MAX_SKIP_BUCKETS);
        assert_eq!(merged[0], bucket(145, 3));
        assert_eq!(merged[1], bucket(70, 2));
        // remaining slots go to the earliest single-count buckets
        let rest: Vec<i64> = merged[2..].iter().map(|b| b.time).collect();
        assert_eq!(rest, vec![0, 5, 10, 15, 20, 25, 30, 35]);
    }

    #[test]
    fn test_halves_round_up() {
        assert_eq!(round_to(12.5, 5), 15);
        assert_eq!(round_to(7.5, 5), 10);
        assert_eq!(round_to(-2.5, 5), 0);
        assert_eq!(round_timestamp(3.5), 4);
        assert_eq!(round_timestamp(3.49), 3);
        assert_eq!(round_timestamp(-0.5), 0);
    }

    #[test]
    fn test_huge_times_saturate() {
        assert_eq!(round_to(1e300, 5), i64::MAX);
        assert_eq!(round_to(-1e300, 5), i64::MIN);
        assert_eq!(merge_skips(&[], &[1e300], 5), vec![bucket(i64::MAX, 1)]);
        assert_eq!(merge_skips(&[], &[-1e300], 5), vec![bucket(i64::MIN, 1)]);
        // stored saturated buckets stay put when merged again
        assert_eq!(
            merge_skips(&[bucket(i64::MAX, 1)], &[1e300], 5),
            vec![bucket(i64::MAX, 2)]
        );
    }

    #[test]
    fn test_counts_saturate() {
        let merged = merge_skips(&[bucket(10, i64::MAX)], &[10.0], 5);
        assert_eq!(merged, vec![bucket(10, i64::MAX)]);
        let merged = merge_skips(&[bucket(10, i64::MAX), bucket(11, 5)], &[], 5);
        assert_eq!(merged, vec![bucket(10, i64::MAX)]);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(merge_skips(&[], &[], 5).is_empty());
        let merged = merge_skips(&[], &[f64::NAN, f64::INFINITY, 4.0], 0);
        assert_eq!(merged, vec![bucket(4, 1)]);
    }
}
