//! Track model and playback mode types
//!
//! Supporting types shared between the player daemon and any client of
//! its API. Tracks are produced by the portal backend when a playlist
//! or ad-hoc track list is resolved and are immutable once queued.

use serde::{Deserialize, Serialize};

/// Media kind of a playable item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// One playable unit of audio or video content
///
/// Insertion order in the queue is playback order unless shuffle is
/// active. Duration comes from backend metadata and may be refined by
/// the media handle once the source is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Backend content identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Audio or video content
    pub kind: MediaKind,
    /// Attributed artist display name
    pub artist_name: String,
    /// Artist identifier
    pub artist_id: String,
    /// Artist profile slug (portal routing)
    pub artist_slug: String,
    /// Cover / thumbnail image URL (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Streamable media URL
    pub media_url: String,
    /// Duration in seconds from backend metadata
    pub duration_seconds: f64,
}

/// Classify a media URL into audio or video by file extension
///
/// Consumed at queue-population time when the backend did not supply a
/// kind. Query strings and fragments are ignored; unknown extensions
/// default to audio.
pub fn classify(media_url: &str) -> MediaKind {
    let path = media_url
        .split(['?', '#'])
        .next()
        .unwrap_or(media_url);
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" | "webm" | "mov" | "mkv" | "m3u8" | "ts" => MediaKind::Video,
        _ => MediaKind::Audio,
    }
}

/// Transport state of the session player
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// No track loaded or playback torn down
    Idle,
    Playing,
    Paused,
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportState::Idle => write!(f, "idle"),
            TransportState::Playing => write!(f, "playing"),
            TransportState::Paused => write!(f, "paused"),
        }
    }
}

/// Repeat mode; cycles off -> all -> one -> off
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    Off,
    All,
    One,
}

impl RepeatMode {
    /// Advance to the next mode in the three-way cycle
    pub fn cycled(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

impl Default for RepeatMode {
    fn default() -> Self {
        RepeatMode::Off
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepeatMode::Off => write!(f, "off"),
            RepeatMode::All => write!(f, "all"),
            RepeatMode::One => write!(f, "one"),
        }
    }
}

/// View-mode preference: which presentation surface renders playback
///
/// `Auto` resolves to the current track's kind; the other two are
/// explicit overrides. Only this mode persists across sessions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Audio,
    Video,
    Auto,
}

impl ViewMode {
    /// Resolve the effective surface for a track of the given kind
    pub fn effective(self, track_kind: MediaKind) -> MediaKind {
        match self {
            ViewMode::Audio => MediaKind::Audio,
            ViewMode::Video => MediaKind::Video,
            ViewMode::Auto => track_kind,
        }
    }
}

impl Default for ViewMode {
    fn default() -> Self {
        ViewMode::Auto
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewMode::Audio => write!(f, "audio"),
            ViewMode::Video => write!(f, "video"),
            ViewMode::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(ViewMode::Audio),
            "video" => Ok(ViewMode::Video),
            "auto" => Ok(ViewMode::Auto),
            other => Err(format!("unknown view mode: {other}")),
        }
    }
}
