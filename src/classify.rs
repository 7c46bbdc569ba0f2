use std::path::Path;

use crate::models::Subtype;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov", "wmv", "webm", "flv"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "aac", "ogg", "wma"];
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "svg", "webp"];
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx", "rtf", "html", "json", "csv"];

/// Map a path to its media category by extension. Unrecognized or missing
/// extensions fall back to `Subtype::Text`.
pub fn classify(path: impl AsRef<Path>) -> Subtype {
    let ext = match path.as_ref().extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => return Subtype::Text,
    };

    let ext = ext.as_str();
    if VIDEO_EXTENSIONS.contains(&ext) {
        Subtype::Video
    } else if AUDIO_EXTENSIONS.contains(&ext) {
        Subtype::Audio
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        Subtype::Image
    } else {
        Subtype::Text
    }
}
