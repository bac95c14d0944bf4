//! Session events for the presentation shell
//!
//! The shell subscribes to these to re-render. `Error` events are the
//! user-facing notification channel: every acquisition or device failure is
//! reported here immediately, with the runtime's own message text.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

use crate::artifact::RecordedArtifact;
use crate::error::{ErrorKind, RecorderError};
use crate::types::RecordingStatus;

/// Capacity of the event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Something the shell may want to render
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Recording status changed
    StatusChanged { status: RecordingStatus },
    /// Device permission was granted
    PermissionChanged { granted: bool },
    /// A new live stream replaced the held one
    StreamAcquired {
        stream_id: String,
        preview_tracks: usize,
    },
    /// A new artifact is ready for playback/download
    ArtifactReady { artifact: RecordedArtifact },
    /// The displayed artifact was cleared
    ArtifactCleared,
    /// An error the user must see
    Error { kind: ErrorKind, message: String },
}

impl SessionEvent {
    /// Build an error notification
    pub fn error(err: &RecorderError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

/// Sending half shared by the session and the stream manager
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventSender {
    /// Create a new event channel
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; having no subscribers is fine
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Surface an error to the user
    pub fn notify_error(&self, err: &RecorderError) {
        warn!("{}", err);
        self.emit(SessionEvent::error(err));
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new()
    }
}
