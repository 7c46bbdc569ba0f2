use std::path::Path;

use tracing::info;

use crate::analytics::{self, round_timestamp};
use crate::cache::Cache;
use crate::config::Settings;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    AnalyticsRecord, ColorPalette, Dislike, Favorite, FileDetails, FileEntry, IndexOutcome, Like,
    ScanSummary, Subtype, Tag,
};
use crate::payload::{AnalyticsUpdate, NewPalette, NewTag, TagUpdate};
use crate::scanner::{normalize_path, relative_key, Scanner};

/// The catalog's operations, one per client request, over a store and a
/// per-file details cache.
pub struct Catalog {
    db: Database,
    settings: Settings,
    details: Cache<i64, FileDetails>,
}

impl Catalog {
    pub fn new(db: Database, settings: Settings) -> Self {
        Self {
            db,
            settings,
            details: Cache::new(),
        }
    }

    /// Open (and initialize) the store named by `settings`.
    pub fn open(settings: Settings) -> Result<Self> {
        let db = Database::new(settings.db_path())?;
        db.init()?;
        Ok(Self::new(db, settings))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &Cache<i64, FileDetails> {
        &self.details
    }

    pub(crate) fn scanner(&self) -> Scanner<'_> {
        Scanner::new(&self.db, &self.settings.root_directory)
            .with_directory_subtype(self.settings.directory_subtype)
            .with_excluded(self.settings.db_files())
    }

    // ── Indexing ─────────────────────────────────────────────────

    pub fn index_tree(&self) -> Result<ScanSummary> {
        let summary = self.scanner().index_tree();
        self.details.clear();
        summary
    }

    /// Index one path under the root, linking it to its directory's entry
    /// when that directory is already cataloged.
    pub fn index_path(&self, full_path: &Path) -> Result<IndexOutcome> {
        let scanner = self.scanner();
        let full = normalize_path(full_path);
        let parent_id = match full.parent().and_then(|p| relative_key(scanner.root(), p)) {
            Some(key) if key != "/" => self.db.find_file_by_path(&key)?.map(|(id, _)| id),
            _ => None,
        };
        scanner.index_entry(&full, parent_id)
    }

    pub fn reclassify(&self) -> Result<usize> {
        let changed = self.db.reclassify_subtypes(self.settings.directory_subtype)?;
        if changed > 0 {
            info!("Updated subtype of {} entries", changed);
            self.details.clear();
        }
        Ok(changed)
    }

    // ── Files ────────────────────────────────────────────────────

    pub fn files(&self) -> Result<Vec<FileEntry>> {
        self.db.list_files()
    }

    pub fn file_details(&self, file_id: i64) -> Result<FileDetails> {
        self.details
            .get_or_try_insert_with(file_id, || self.db.file_details(file_id))
    }

    pub fn delete_file(&self, file_id: i64) -> Result<()> {
        self.db.delete_file(file_id)?;
        // children went with it
        self.details.clear();
        Ok(())
    }

    // ── Analytics ────────────────────────────────────────────────

    pub fn record_view(&self, file_id: i64, file_type: Subtype) -> Result<AnalyticsRecord> {
        let record = analytics::record_view(&self.db, file_id, file_type)?;
        self.details.invalidate(&file_id);
        Ok(record)
    }

    pub fn update_analytics(&self, update: &AnalyticsUpdate) -> Result<AnalyticsRecord> {
        let record = analytics::apply_update(&self.db, update, self.settings.skip_bucket_secs)?;
        self.details.invalidate(&update.file_id);
        Ok(record)
    }

    pub fn analytics(&self, file_id: i64) -> Result<Option<AnalyticsRecord>> {
        self.db.analytics_for_file(file_id)
    }

    // ── Likes / dislikes / favorites ─────────────────────────────

    pub fn add_like(&self, file_id: i64, timestamp: f64) -> Result<Like> {
        let like = self.db.add_like(file_id, round_timestamp(timestamp))?;
        self.details.invalidate(&file_id);
        Ok(like)
    }

    pub fn likes(&self, file_id: i64) -> Result<Vec<Like>> {
        self.db.likes_for_file(file_id)
    }

    pub fn remove_like(&self, id: i64) -> Result<()> {
        let file_id = self.db.remove_like(id)?;
        self.details.invalidate(&file_id);
        Ok(())
    }

    pub fn add_dislike(&self, file_id: i64, timestamp: f64) -> Result<Dislike> {
        let dislike = self.db.add_dislike(file_id, round_timestamp(timestamp))?;
        self.details.invalidate(&file_id);
        Ok(dislike)
    }

    pub fn dislikes(&self, file_id: i64) -> Result<Vec<Dislike>> {
        self.db.dislikes_for_file(file_id)
    }

    pub fn remove_dislike(&self, id: i64) -> Result<()> {
        let file_id = self.db.remove_dislike(id)?;
        self.details.invalidate(&file_id);
        Ok(())
    }

    pub fn add_favorite(&self, file_id: i64, timestamp: Option<f64>) -> Result<Favorite> {
        let favorite = self.db.add_favorite(file_id, timestamp.map(round_timestamp))?;
        self.details.invalidate(&file_id);
        Ok(favorite)
    }

    pub fn favorite(&self, file_id: i64) -> Result<Favorite> {
        self.db
            .favorite_for_file(file_id)?
            .ok_or_else(|| Error::not_found("favorite", file_id))
    }

    pub fn remove_favorite(&self, file_id: i64) -> Result<()> {
        self.db.remove_favorite(file_id)?;
        self.details.invalidate(&file_id);
        Ok(())
    }

    // ── Tags ─────────────────────────────────────────────────────

    pub fn tags(&self) -> Result<Vec<Tag>> {
        self.db.list_tags()
    }

    pub fn file_tags(&self, file_id: i64) -> Result<Vec<Tag>> {
        self.db.tags_for_file(file_id)
    }

    pub fn create_tag(&self, tag: &NewTag) -> Result<Tag> {
        self.db.create_tag(tag)
    }

    pub fn update_tag(&self, id: i64, update: &TagUpdate) -> Result<Tag> {
        self.db.update_tag(id, update)
    }

    pub fn delete_tag(&self, id: i64) -> Result<()> {
        let tagged = self.db.files_with_tag(id)?;
        self.db.delete_tag(id)?;
        for file_id in tagged {
            self.details.invalidate(&file_id);
        }
        Ok(())
    }

    pub fn tag_file(&self, file_id: i64, tag_id: i64) -> Result<()> {
        self.db.tag_file(file_id, tag_id)?;
        self.details.invalidate(&file_id);
        Ok(())
    }

    pub fn untag_file(&self, file_id: i64, tag_id: i64) -> Result<()> {
        self.db.untag_file(file_id, tag_id)?;
        self.details.invalidate(&file_id);
        Ok(())
    }

    // ── Color palettes ───────────────────────────────────────────

    pub fn create_palette(&self, palette: &NewPalette) -> Result<ColorPalette> {
        self.db.create_palette(palette)
    }

    pub fn palettes(&self) -> Result<Vec<ColorPalette>> {
        self.db.list_palettes()
    }

    pub fn palette(&self, id: i64) -> Result<ColorPalette> {
        self.db
            .get_palette(id)?
            .ok_or_else(|| Error::not_found("color palette", id))
    }

    pub fn delete_palette(&self, id: i64) -> Result<()> {
        self.db.delete_palette(id)
    }
}
