//! Payload bounds and coercion helpers
//!
//! Inbound payloads are never trusted: oversized text is truncated,
//! names are trimmed and length-checked, and media URLs are checked by
//! extension before they reach any store.

use crate::error::ChatError;

/// Maximum characters of a room or private message text
pub const MAX_MESSAGE_CHARS: usize = 1000;
/// Maximum characters of a room name
pub const MAX_ROOM_NAME_CHARS: usize = 100;
/// Maximum characters of a room description
pub const MAX_ROOM_DESCRIPTION_CHARS: usize = 500;
/// Maximum characters of a login handle
pub const MAX_HANDLE_CHARS: usize = 30;
/// Allowed display name length (inclusive)
pub const DISPLAY_NAME_CHARS: std::ops::RangeInclusive<usize> = 3..=30;
/// Maximum characters of a mute/ban reason
pub const MAX_REASON_CHARS: usize = 200;

pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".webm", ".ogg", ".ogv", ".mov", ".m4v"];

/// Truncate to at most `max` characters (not bytes)
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Trim and truncate message text, rejecting empty input
pub fn message_text(text: &str) -> Result<String, ChatError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ChatError::Validation("Message text is empty".to_string()));
    }
    Ok(truncate_chars(text, MAX_MESSAGE_CHARS))
}

/// Trim and length-check a display name
pub fn display_name(name: &str) -> Result<String, ChatError> {
    let name = name.trim();
    if !DISPLAY_NAME_CHARS.contains(&name.chars().count()) {
        return Err(ChatError::Validation(format!(
            "Display name must be {}-{} characters",
            DISPLAY_NAME_CHARS.start(),
            DISPLAY_NAME_CHARS.end()
        )));
    }
    Ok(name.to_string())
}

/// Trim and length-check a login handle
pub fn handle(handle: &str) -> Result<String, ChatError> {
    let handle = handle.trim();
    if handle.is_empty() || handle.chars().count() > MAX_HANDLE_CHARS {
        return Err(ChatError::Validation(format!(
            "Username must be 1-{MAX_HANDLE_CHARS} characters"
        )));
    }
    Ok(handle.to_string())
}

/// Path part of a URL, without query string or fragment
fn url_path(url: &str) -> &str {
    let end = url.find(|c| c == '?' || c == '#').unwrap_or(url.len());
    &url[..end]
}

/// Whether the URL path ends in one of `extensions` (case-insensitive)
pub fn has_extension(url: &str, extensions: &[&str]) -> bool {
    let path = url_path(url).to_ascii_lowercase();
    extensions.iter().any(|ext| path.ends_with(ext))
}

/// Whether the URL uses an http(s) scheme
pub fn is_http_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) && lower.len() > "https://".len()
}

/// Validate an image message URL
pub fn image_url(url: &str) -> Result<String, ChatError> {
    let url = url.trim();
    if !is_http_url(url) {
        return Err(ChatError::Validation("Invalid image URL".to_string()));
    }
    Ok(url.to_string())
}

/// Validate a video message URL
pub fn video_url(url: &str) -> Result<String, ChatError> {
    let url = url.trim();
    if !is_http_url(url) || !has_extension(url, VIDEO_EXTENSIONS) {
        return Err(ChatError::Validation(format!(
            "Video URL must end in one of: {}",
            VIDEO_EXTENSIONS.join(", ")
        )));
    }
    Ok(url.to_string())
}

/// Validate a profile picture URL
pub fn profile_picture_url(url: &str) -> Result<String, ChatError> {
    let url = url.trim();
    if url.is_empty() || !has_extension(url, IMAGE_EXTENSIONS) {
        return Err(ChatError::Validation(format!(
            "Profile picture must end in one of: {}",
            IMAGE_EXTENSIONS.join(", ")
        )));
    }
    Ok(url.to_string())
}

/// Clamp a volume into [0, 1]
pub fn volume(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Treat empty strings as absent
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
