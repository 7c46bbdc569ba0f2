//! Request normalization. Raw JSON from a client is turned into fully
//! populated records here, so the store and analytics code never see
//! missing or mistyped fields.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::Subtype;

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::invalid(format!("{what} payload must be a JSON object")))
}

/// A required positive id. Numeric strings are accepted.
fn require_id(obj: &Map<String, Value>, key: &str) -> Result<i64> {
    let id = match obj.get(key) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    match id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(Error::invalid(format!("{key} is required"))),
    }
}

fn require_subtype(obj: &Map<String, Value>, key: &str) -> Result<Subtype> {
    let raw = obj
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid(format!("{key} is required")))?;
    raw.parse().map_err(Error::InvalidInput)
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        Some(other) => {
            warn!("Ignoring non-numeric {}: {}", key, other);
            None
        }
    }
}

fn counter(obj: &Map<String, Value>, key: &str) -> i64 {
    number(obj, key).map(|v| v.round() as i64).unwrap_or(0)
}

/// Trimmed string, with blank treated as absent.
fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Raw skip timestamps. Anything other than an array becomes an empty list;
/// non-numeric items are dropped.
pub fn skip_times(value: Option<&Value>) -> Vec<f64> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_f64)
            .filter(|t| t.is_finite())
            .collect(),
        Some(other) => {
            warn!("skips is not an array: {}", other);
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewEvent {
    pub file_id: i64,
    pub file_type: Subtype,
}

impl ViewEvent {
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, "view")?;
        Ok(Self {
            file_id: require_id(obj, "fileId")?,
            file_type: require_subtype(obj, "fileType")?,
        })
    }
}

/// A watch-time / skip / scroll report for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsUpdate {
    pub file_id: i64,
    pub file_type: Subtype,
    pub total_watch_time: f64,
    pub skips: Vec<f64>,
    pub scroll_up_count: i64,
    pub scroll_down_count: i64,
}

impl AnalyticsUpdate {
    pub fn new(file_id: i64, file_type: Subtype) -> Self {
        Self {
            file_id,
            file_type,
            total_watch_time: 0.0,
            skips: Vec::new(),
            scroll_up_count: 0,
            scroll_down_count: 0,
        }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, "analytics")?;
        Ok(Self {
            file_id: require_id(obj, "fileId")?,
            file_type: require_subtype(obj, "fileType")?,
            total_watch_time: number(obj, "totalWatchTime").unwrap_or(0.0),
            skips: skip_times(obj.get("skips")),
            scroll_up_count: counter(obj, "scrollUpCount"),
            scroll_down_count: counter(obj, "scrollDownCount"),
        })
    }
}

/// A like or dislike at a playback position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampEvent {
    pub file_id: i64,
    pub timestamp: f64,
}

impl TimestampEvent {
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, "timestamp")?;
        let file_id = require_id(obj, "fileId")?;
        let timestamp =
            number(obj, "timestamp").ok_or_else(|| Error::invalid("timestamp is required"))?;
        Ok(Self { file_id, timestamp })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FavoriteRequest {
    pub file_id: i64,
    pub timestamp: Option<f64>,
}

impl FavoriteRequest {
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, "favorite")?;
        Ok(Self {
            file_id: require_id(obj, "fileId")?,
            timestamp: number(obj, "timestamp"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
    pub tag_group: Option<String>,
    pub color: Option<String>,
}

impl NewTag {
    pub fn new(name: &str, tag_group: Option<&str>, color: Option<&str>) -> Result<Self> {
        let clean = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        let name = clean(Some(name)).ok_or_else(|| Error::invalid("name is required"))?;
        Ok(Self {
            name,
            tag_group: clean(tag_group),
            color: clean(color),
        })
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, "tag")?;
        Ok(Self {
            name: text(obj, "name").ok_or_else(|| Error::invalid("name is required and must be a string"))?,
            tag_group: text(obj, "tagGroup"),
            color: text(obj, "color"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub name: Option<String>,
    pub tag_group: Option<String>,
    pub color: Option<String>,
}

impl TagUpdate {
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, "tag")?;
        Self {
            name: text(obj, "name"),
            tag_group: text(obj, "tagGroup"),
            color: text(obj, "color"),
        }
        .validated()
    }

    /// Reject an update that would change nothing.
    pub fn validated(self) -> Result<Self> {
        if self.name.is_none() && self.tag_group.is_none() && self.color.is_none() {
            return Err(Error::invalid(
                "At least one of name, tagGroup, or color must be provided.",
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPalette {
    pub name: String,
    pub colors: Vec<String>,
}

impl NewPalette {
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, "color palette")?;
        let name = text(obj, "name").ok_or_else(|| Error::invalid("name is required"))?;
        let colors = match obj.get("colorPalette") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            _ => return Err(Error::invalid("colorPalette must be an array of colors")),
        };
        Ok(Self { name, colors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analytics_update_defaults() {
        let update = AnalyticsUpdate::from_json(&json!({"fileId": 3, "fileType": "video"})).unwrap();
        assert_eq!(update, AnalyticsUpdate::new(3, Subtype::Video));
    }

    #[test]
    fn test_non_array_skips_become_empty() {
        let update = AnalyticsUpdate::from_json(&json!({
            "fileId": 3,
            "fileType": "audio",
            "skips": "12,13",
            "totalWatchTime": 40.5
        }))
        .unwrap();
        assert!(update.skips.is_empty());
        assert_eq!(update.total_watch_time, 40.5);
    }

    #[test]
    fn test_skip_items_that_are_not_numbers_are_dropped() {
        let times = skip_times(Some(&json!([12, "x", null, 13.5, {"t": 1}])));
        assert_eq!(times, vec![12.0, 13.5]);
    }

    #[test]
    fn test_missing_identifiers_are_rejected() {
        let err = AnalyticsUpdate::from_json(&json!({"fileType": "video"})).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = ViewEvent::from_json(&json!({"fileId": 0, "fileType": "video"})).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = ViewEvent::from_json(&json!({"fileId": 2, "fileType": "hologram"})).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(ViewEvent::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_string_ids_are_accepted() {
        let event = TimestampEvent::from_json(&json!({"fileId": "12", "timestamp": 4.4})).unwrap();
        assert_eq!(event.file_id, 12);
        assert!(TimestampEvent::from_json(&json!({"fileId": 12})).is_err());
    }

    #[test]
    fn test_tag_payloads_are_trimmed() {
        let tag = NewTag::from_json(&json!({"name": "  sunset ", "tagGroup": " ", "color": "#fa0"})).unwrap();
        assert_eq!(tag.name, "sunset");
        assert_eq!(tag.tag_group, None);
        assert_eq!(tag.color.as_deref(), Some("#fa0"));

        assert!(TagUpdate::from_json(&json!({"name": ""})).is_err());
        assert!(NewTag::new("   ", None, None).is_err());
    }

    #[test]
    fn test_palette_requires_color_array() {
        let palette = NewPalette::from_json(&json!({"name": "warm", "colorPalette": ["#f00", "#fa0"]})).unwrap();
        assert_eq!(palette.colors.len(), 2);
        assert!(NewPalette::from_json(&json!({"name": "warm", "colorPalette": "#f00"})).is_err());
    }
}
