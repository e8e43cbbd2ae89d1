//! System settings
//!
//! Site branding, background music, per-room party mode and the shared
//! video-watch session shown in the official room.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::RoomId;
use crate::validation;

const DEFAULT_VOLUME: f32 = 0.5;

/// Kind of a shared video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    Youtube,
    Instagram,
    Mp4,
}

impl VideoKind {
    /// Guess the kind from a URL (defaults to YouTube)
    pub fn detect(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.contains("youtube.com") || lower.contains("youtu.be") {
            Self::Youtube
        } else if lower.contains("instagram.com") {
            Self::Instagram
        } else if validation::has_extension(&lower, &[".mp4"]) {
            Self::Mp4
        } else {
            Self::Youtube
        }
    }
}

/// Player size of a shared video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// The active shared video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSession {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: VideoKind,
    pub size: VideoSize,
    pub started_by: String,
    pub started_at: DateTime<Utc>,
}

/// Partial settings update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub site_logo: Option<String>,
    pub site_title: Option<String>,
    pub background_color: Option<String>,
    pub login_music: Option<String>,
    pub chat_music: Option<String>,
    pub login_music_volume: Option<f32>,
    pub chat_music_volume: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub site_logo: String,
    pub site_title: String,
    pub background_color: String,
    pub login_music: String,
    pub chat_music: String,
    pub login_music_volume: f32,
    pub chat_music_volume: f32,
    #[serde(default)]
    pub party_mode: HashMap<RoomId, bool>,
    #[serde(default)]
    pub video: Option<VideoSession>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            site_logo: String::new(),
            site_title: "Chat Room".to_string(),
            background_color: "blue".to_string(),
            login_music: String::new(),
            chat_music: String::new(),
            login_music_volume: DEFAULT_VOLUME,
            chat_music_volume: DEFAULT_VOLUME,
            party_mode: HashMap::new(),
            video: None,
        }
    }
}

impl SystemSettings {
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(logo) = update.site_logo {
            self.site_logo = logo.trim().to_string();
        }
        if let Some(title) = update.site_title {
            self.site_title = title.trim().to_string();
        }
        if let Some(color) = update.background_color {
            self.background_color = color.trim().to_string();
        }
        if let Some(music) = update.login_music {
            self.login_music = music.trim().to_string();
        }
        if let Some(music) = update.chat_music {
            self.chat_music = music.trim().to_string();
        }
        if let Some(volume) = update.login_music_volume {
            self.login_music_volume = validation::volume(volume);
        }
        if let Some(volume) = update.chat_music_volume {
            self.chat_music_volume = validation::volume(volume);
        }
    }

    pub fn party_mode(&self, room_id: RoomId) -> bool {
        self.party_mode.get(&room_id).copied().unwrap_or(false)
    }

    pub fn set_party_mode(&mut self, room_id: RoomId, enabled: bool) {
        self.party_mode.insert(room_id, enabled);
    }

    pub fn forget_room(&mut self, room_id: RoomId) {
        self.party_mode.remove(&room_id);
    }

    /// Start (or replace) the shared video session
    pub fn start_video(
        &mut self,
        url: String,
        kind: Option<VideoKind>,
        size: Option<VideoSize>,
        started_by: String,
        now: DateTime<Utc>,
    ) -> &VideoSession {
        let kind = kind.unwrap_or_else(|| VideoKind::detect(&url));
        self.video.insert(VideoSession {
            url,
            kind,
            size: size.unwrap_or_default(),
            started_by,
            started_at: now,
        })
    }

    /// Returns true if a session was active
    pub fn stop_video(&mut self) -> bool {
        self.video.take().is_some()
    }

    /// Resize the active session, if any
    pub fn resize_video(&mut self, size: VideoSize) -> Option<&VideoSession> {
        let session = self.video.as_mut()?;
        session.size = size;
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_partial_update() {
        let mut settings = SystemSettings::default();
        settings.apply(SettingsUpdate {
            site_title: Some(" Lobby ".into()),
            chat_music_volume: Some(4.0),
            ..Default::default()
        });

        assert_eq!(settings.site_title, "Lobby");
        assert_eq!(settings.chat_music_volume, 1.0);
        assert_eq!(settings.background_color, "blue");
    }

    #[test]
    fn test_video_kind_detection() {
        assert_eq!(VideoKind::detect("https://youtu.be/abc"), VideoKind::Youtube);
        assert_eq!(
            VideoKind::detect("https://www.instagram.com/reel/x"),
            VideoKind::Instagram
        );
        assert_eq!(VideoKind::detect("https://cdn.io/a.MP4"), VideoKind::Mp4);
        assert_eq!(VideoKind::detect("dQw4w9WgXcQ"), VideoKind::Youtube);
    }

    #[test]
    fn test_video_lifecycle() {
        let mut settings = SystemSettings::default();
        assert!(settings.resize_video(VideoSize::Large).is_none());

        let session = settings.start_video("https://cdn.io/a.mp4".into(), None, None, "Boss".into(), Utc::now());
        assert_eq!(session.kind, VideoKind::Mp4);
        assert_eq!(session.size, VideoSize::Medium);

        assert_eq!(settings.resize_video(VideoSize::Small).unwrap().size, VideoSize::Small);
        assert!(settings.stop_video());
        assert!(!settings.stop_video());
    }

    #[test]
    fn test_party_mode() {
        let mut settings = SystemSettings::default();
        let room = RoomId::new();
        assert!(!settings.party_mode(room));
        settings.set_party_mode(room, true);
        assert!(settings.party_mode(room));
        settings.forget_room(room);
        assert!(!settings.party_mode(room));
    }

    #[test]
    fn test_video_session_wire_shape() {
        let mut settings = SystemSettings::default();
        settings.start_video("https://youtu.be/x".into(), None, Some(VideoSize::Large), "Boss".into(), Utc::now());
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["video"]["type"], "youtube");
        assert_eq!(json["video"]["size"], "large");
        assert_eq!(json["siteTitle"], "Chat Room");
    }
}
