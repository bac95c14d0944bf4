//! Error types for vidrec

use serde::Serialize;
use thiserror::Error;

/// Result type alias using RecorderError
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Main error type for vidrec operations
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The runtime has no capture API at all
    #[error("{0}")]
    UnsupportedRuntime(String),

    /// The user or the system refused device access
    #[error("{0}")]
    PermissionDenied(String),

    /// Acquisition failed for a reason other than denial (device busy, hardware fault)
    #[error("{0}")]
    DeviceUnavailable(String),

    /// Capture engine error
    #[error("Capture engine error: {0}")]
    Engine(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No live device stream is held
    #[error("No live stream available")]
    NoLiveStream,

    /// Stop requested while nothing is recording
    #[error("No active recording session")]
    NoActiveSession,

    /// Start requested while already recording
    #[error("Recording already in progress")]
    SessionAlreadyRunning,

    /// No finished recording to play or save
    #[error("No recording available")]
    NoArtifact,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RecorderError>,
    },
}

/// Coarse classification used when reporting errors to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedRuntime,
    PermissionDenied,
    DeviceUnavailable,
    Engine,
    Config,
    NoLiveStream,
    NoActiveSession,
    SessionAlreadyRunning,
    NoArtifact,
    Io,
}

impl RecorderError {
    /// Create an unsupported-runtime error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedRuntime(msg.into())
    }

    /// Create a permission-denied error
    pub fn denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a device-unavailable error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    /// Create a capture engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers peeled off
    pub fn root(&self) -> &RecorderError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedRuntime(_) => ErrorKind::UnsupportedRuntime,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            Self::Engine(_) => ErrorKind::Engine,
            Self::Config(_) => ErrorKind::Config,
            Self::NoLiveStream => ErrorKind::NoLiveStream,
            Self::NoActiveSession => ErrorKind::NoActiveSession,
            Self::SessionAlreadyRunning => ErrorKind::SessionAlreadyRunning,
            Self::NoArtifact => ErrorKind::NoArtifact,
            Self::Io(_) => ErrorKind::Io,
            Self::WithContext { source, .. } => source.kind(),
        }
    }

    /// Message shown to the user in the blocking notification.
    ///
    /// Device errors carry the runtime's own message text and nothing else.
    pub fn user_message(&self) -> String {
        self.root().to_string()
    }

    /// Whether this is one of the three device acquisition failures
    pub fn is_acquisition_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnsupportedRuntime | ErrorKind::PermissionDenied | ErrorKind::DeviceUnavailable
        )
    }

    /// A short hint on how the user can get past this error
    pub fn user_hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::UnsupportedRuntime => {
                Some("This runtime has no capture support. Try a different backend or device.")
            }
            ErrorKind::PermissionDenied => {
                Some("Grant camera and microphone access, then run `grant` again.")
            }
            ErrorKind::DeviceUnavailable => {
                Some("Close other applications using the camera or microphone and retry.")
            }
            ErrorKind::Config => Some("Check ~/.config/vidrec/config.toml for invalid values."),
            ErrorKind::NoLiveStream => Some("Wait for the live preview, or run `reset` to reacquire devices."),
            ErrorKind::SessionAlreadyRunning => Some("Run `stop` before starting a new recording."),
            ErrorKind::NoActiveSession => Some("Run `start` to begin recording."),
            ErrorKind::NoArtifact => Some("Record something with `start` and `stop` first."),
            ErrorKind::Engine | ErrorKind::Io => None,
        }
    }

    /// Whether the user can recover from this error without code changes
    pub fn is_user_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Engine | ErrorKind::Io)
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl From<toml::de::Error> for RecorderError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse config file: {}", err))
    }
}

impl From<toml::ser::Error> for RecorderError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Config(format!("Failed to serialize config: {}", err))
    }
}
