//! vidrec Core Library
//!
//! Camera + microphone recording sessions with live preview.
//!
//! This library provides:
//! - Live device stream acquisition with permission tracking
//! - Encoding negotiation against the runtime's capture engine
//! - A start/stop recording state machine that buffers encoded fragments
//! - Recorded artifacts addressable by object URL, ready to download
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌────────────────┐    ┌─────────────────┐
//! │ Device Streams  │───▶│ Capture Engine │───▶│ Chunk Buffer    │
//! │ (audio + video) │    │ (negotiated)   │    │ ─▶ Artifact URL │
//! └─────────────────┘    └────────────────┘    └─────────────────┘
//! ```

pub mod artifact;
pub mod buffer;
pub mod capture;
pub mod config;
pub mod encoding;
pub mod error;
pub mod event;
pub mod runtime;
pub mod session;
pub mod types;

pub use artifact::{ArtifactRegistry, ArtifactUrl, Blob, RecordedArtifact};
pub use capture::{CaptureBackend, CaptureEngine, MediaDevices, Runtime};
pub use config::{ConfigFile, ReacquireMode, SessionConfig};
pub use encoding::{CapabilityNegotiator, MimeType};
pub use error::{ErrorKind, RecorderError, Result};
pub use event::SessionEvent;
pub use runtime::{SyntheticOptions, SyntheticRuntime};
pub use session::{RecordingSession, SessionStats};
pub use types::{DeviceStream, Handle, MediaStream, MediaTrack, RecordingStatus, TrackKind};
