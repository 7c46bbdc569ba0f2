use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Coarse media category derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subtype {
    Video,
    Audio,
    Image,
    Text,
}

impl Subtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subtype::Video => "video",
            Subtype::Audio => "audio",
            Subtype::Image => "image",
            Subtype::Text => "text",
        }
    }
}

impl fmt::Display for Subtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subtype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Subtype::Video),
            "audio" => Ok(Subtype::Audio),
            "image" => Ok(Subtype::Image),
            "text" => Ok(Subtype::Text),
            other => Err(format!("unknown subtype '{other}'")),
        }
    }
}

impl ToSql for Subtype {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Subtype {
    // Older stores carry categories like 'unknown' or 'archive'; they read as text.
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Ok(raw.parse().unwrap_or(Subtype::Text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::File => "file",
            FileKind::Directory => "directory",
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FileKind::Directory)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for FileKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for FileKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "directory" => Ok(FileKind::Directory),
            _ => Ok(FileKind::File),
        }
    }
}

/// A row of the `files` table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: i64,
    pub path: String, // root-relative, e.g. "/movies/a.mp4"
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub subtype: Subtype,
    pub parent_id: Option<i64>,
    pub size: Option<i64>,
    pub last_modified: Option<String>,
    pub created_at: String,
}

impl FileEntry {
    /// Last path segment, the name shown to users.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Values for a `files` insert; the store assigns id and created_at.
#[derive(Debug, Clone)]
pub struct NewFileEntry {
    pub path: String,
    pub kind: FileKind,
    pub subtype: Subtype,
    pub parent_id: Option<i64>,
    pub size: Option<i64>,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Indexed,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOutcome {
    pub id: i64,
    pub status: IndexStatus,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

/// Counters for one walk of a directory tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub indexed: usize,
    pub already_indexed: usize,
    pub failed: usize,
}

impl ScanSummary {
    pub fn record(&mut self, outcome: &IndexOutcome) {
        match outcome.status {
            IndexStatus::Indexed => self.indexed += 1,
            IndexStatus::AlreadyExists => self.already_indexed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.indexed + self.already_indexed + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipBucket {
    pub time: i64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsRecord {
    pub id: i64,
    pub file_id: i64,
    pub file_type: Subtype,
    pub last_viewed: Option<String>,
    pub total_watch_time: f64,
    pub view_count: i64,
    pub skips: Vec<SkipBucket>,
    pub scroll_up_count: i64,
    pub scroll_down_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub tag_group: Option<String>,
    pub color: Option<String>,
    pub created_at: String,
}

/// A like or a dislike; both tables share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub id: i64,
    pub file_id: i64,
    pub timestamp: i64,
    pub created_at: String,
}

pub type Like = Reaction;
pub type Dislike = Reaction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: i64,
    pub file_id: i64,
    pub timestamp: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPalette {
    pub id: i64,
    pub name: String,
    pub colors: Vec<String>,
    pub created_at: String,
}

/// A file with everything the player view needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetails {
    #[serde(flatten)]
    pub file: FileEntry,
    pub tags: Vec<i64>,
    pub likes: Vec<Like>,
    pub like_count: usize,
    pub dislikes: Vec<Dislike>,
    pub favorite: Option<Favorite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics: Option<AnalyticsRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_parse_is_case_insensitive() {
        assert_eq!("VIDEO".parse::<Subtype>(), Ok(Subtype::Video));
        assert_eq!(" image ".parse::<Subtype>(), Ok(Subtype::Image));
        assert!("archive".parse::<Subtype>().is_err());
    }

    #[test]
    fn test_file_entry_serializes_type_field() {
        let entry = FileEntry {
            id: 1,
            path: "/movies/a.mp4".to_string(),
            kind: FileKind::File,
            subtype: Subtype::Video,
            parent_id: Some(4),
            size: Some(10),
            last_modified: None,
            created_at: "2024-01-01 00:00:00".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "file");
        assert_eq!(json["parentId"], 4);
        assert_eq!(entry.file_name(), "a.mp4");
    }

    #[test]
    fn test_scan_summary_counts() {
        let mut summary = ScanSummary::default();
        summary.record(&IndexOutcome {
            id: 1,
            status: IndexStatus::Indexed,
            kind: FileKind::File,
        });
        summary.record(&IndexOutcome {
            id: 2,
            status: IndexStatus::AlreadyExists,
            kind: FileKind::Directory,
        });
        summary.failed += 1;
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.indexed, 1);
    }
}
