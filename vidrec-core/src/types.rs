//! Core types for vidrec
//!
//! These types represent live device streams, their tracks, and the
//! recording status shared between the session and the presentation shell.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Global handle counter for unique session IDs
static HANDLE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque handle for a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Create a new unique handle
    pub fn new() -> Self {
        Self(HANDLE_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw handle value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

/// Recording status as seen by the presentation shell
///
/// A paused state is possible in principle but is not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingStatus {
    /// Not recording
    #[default]
    Inactive,
    /// Capture engine running
    Started,
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => write!(f, "INACTIVE"),
            Self::Started => write!(f, "STARTED"),
        }
    }
}

/// Kind of media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// A single live input track from a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTrack {
    /// Unique track identifier
    pub id: String,
    /// Audio or video
    pub kind: TrackKind,
    /// Human-readable device label
    pub label: String,
}

impl MediaTrack {
    /// Create a track with a fresh id
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
        }
    }
}

impl std::fmt::Display for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} track '{}'", self.kind, self.label)
    }
}

/// A runtime handle over a set of live tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaStream {
    /// Unique stream identifier
    pub id: String,
    /// Tracks carried by this stream
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    /// Create a stream from a list of tracks
    pub fn from_tracks(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
        }
    }

    /// Audio tracks in this stream
    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Audio)
    }

    /// Video tracks in this stream
    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Video)
    }

    /// Whether the stream has at least one track of the given kind
    pub fn has_kind(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }
}

/// Constraints passed to device access requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaConstraints {
    /// Request microphone input
    pub audio: bool,
    /// Request camera input
    pub video: bool,
}

impl MediaConstraints {
    /// Audio and video together
    pub const AUDIO_VIDEO: Self = Self {
        audio: true,
        video: true,
    };

    /// Microphone only
    pub const AUDIO_ONLY: Self = Self {
        audio: true,
        video: false,
    };

    /// Camera only
    pub const VIDEO_ONLY: Self = Self {
        audio: false,
        video: true,
    };
}

impl std::fmt::Display for MediaConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{audio: {}, video: {}}}", self.audio, self.video)
    }
}

/// A fully acquired device stream
///
/// `combined` carries one video and one audio track and is what the capture
/// engine records. `preview` is the video-only stream shown on the live
/// preview surface, so the microphone never reaches the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStream {
    /// Merged audio + video stream for capture
    pub combined: MediaStream,
    /// Video-only stream for the preview surface
    pub preview: MediaStream,
}

impl DeviceStream {
    /// Combined stream id
    pub fn id(&self) -> &str {
        &self.combined.id
    }
}
