//! Recording session state machine
//!
//! Drives a capture engine through start/stop over the live device stream,
//! collects its fragments, and turns them into a recorded artifact on stop.
//!
//! ```text
//!             start()                         stop()
//! INACTIVE ───────────▶ STARTED ───────────────────────▶ INACTIVE
//!    ▲                    │ engine ──▶ chunk collector        │
//!    │                    └──────────────────────────────────┘
//!    │                                assemble ─▶ artifact
//!    └── reset(): clear artifact, reacquire devices
//! ```

use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::artifact::{ArtifactRegistry, Blob, RecordedArtifact};
use crate::buffer::{ChunkBuffer, spawn_collector};
use crate::capture::{CaptureEngine, DeviceStreamManager, Runtime};
use crate::config::{ReacquireMode, SessionConfig};
use crate::encoding::{CapabilityNegotiator, MimeType};
use crate::error::{RecorderError, Result};
use crate::event::{EventSender, SessionEvent};
use crate::types::{DeviceStream, Handle, MediaStream, RecordingStatus};

/// One in-flight recording
struct ActiveCapture {
    /// Engine bound to the stream held at start
    engine: Box<dyn CaptureEngine>,
    /// Sole writer of this recording's chunk buffer
    collector: JoinHandle<ChunkBuffer>,
    /// Encoding resolved at start; tags the artifact
    mime: MimeType,
    /// Stream the engine was bound to
    stream_id: String,
    started_at: Instant,
}

/// Recording session
///
/// All fields are private; the transitions below are the only mutators.
pub struct RecordingSession {
    handle: Handle,
    config: SessionConfig,
    negotiator: CapabilityNegotiator,
    streams: DeviceStreamManager,
    registry: ArtifactRegistry,
    events: EventSender,
    status: RecordingStatus,
    active: Option<ActiveCapture>,
    artifact: Option<RecordedArtifact>,
    /// Reacquisitions started in concurrent mode
    background: Vec<JoinHandle<()>>,
    recordings_completed: u64,
}

impl RecordingSession {
    /// Create a session over the given runtime
    pub fn new(runtime: Runtime, config: SessionConfig) -> Result<Self> {
        config.validate_strict().map_err(RecorderError::config)?;
        for warning in config.validate() {
            warn!("{}", warning);
        }

        let events = EventSender::new();
        let streams = DeviceStreamManager::new(runtime.devices, runtime.backend, events.clone());
        let handle = Handle::new();

        info!(
            "Session {} created ({} encoding candidates, {} reacquire)",
            handle,
            config.candidates.len(),
            config.reacquire
        );

        Ok(Self {
            handle,
            negotiator: config.negotiator(),
            config,
            streams,
            registry: ArtifactRegistry::new(),
            events,
            status: RecordingStatus::Inactive,
            active: None,
            artifact: None,
            background: Vec::new(),
            recordings_completed: 0,
        })
    }

    /// Get the session handle
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Get the current status
    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Initial load: acquire devices, prompting for permission first
    pub async fn mount(&mut self) -> Result<DeviceStream> {
        info!("Session {} mounting", self.handle);
        self.clear_artifact();
        self.streams.acquire_live_stream(true).await
    }

    /// The shell's "grant permission" intent
    pub async fn request_permissions(&self) -> Result<()> {
        self.streams.request_permissions().await
    }

    /// Start recording.
    ///
    /// Sets `STARTED`, clears the shown artifact, reacquires devices, then
    /// binds a new engine to the held stream with the negotiated encoding.
    /// A failed reacquisition is reported but recording proceeds on the
    /// stream already held. Without any held stream no engine is created and
    /// the status drops back to `INACTIVE`.
    pub async fn start(&mut self) -> Result<()> {
        if self.status == RecordingStatus::Started {
            return Err(RecorderError::SessionAlreadyRunning);
        }

        self.set_status(RecordingStatus::Started);
        self.clear_artifact();

        let stream = match self.config.reacquire {
            ReacquireMode::Sequenced => {
                // Failure already reported; fall back to the held stream
                let _ = self.streams.acquire_live_stream(false).await;
                self.streams.current()
            }
            ReacquireMode::Concurrent => {
                self.background.retain(|task| !task.is_finished());
                let streams = self.streams.clone();
                self.background.push(tokio::spawn(async move {
                    let _ = streams.acquire_live_stream(false).await;
                }));
                self.streams.current()
            }
        };

        let Some(stream) = stream else {
            return Err(self.abort_start(RecorderError::NoLiveStream));
        };

        let mime = self.negotiator.select_encoding(self.streams.backend().as_ref());
        let mut engine = match self.streams.backend().create_engine(&stream.combined, &mime) {
            Ok(engine) => engine,
            Err(e) => return Err(self.abort_start(e)),
        };

        let (sink, collector) = spawn_collector();
        if let Err(e) = engine.start(sink) {
            collector.abort();
            return Err(self.abort_start(e));
        }

        info!(
            "Session {} recording stream {} as {}",
            self.handle,
            stream.id(),
            mime
        );

        self.active = Some(ActiveCapture {
            engine,
            collector,
            mime,
            stream_id: stream.id().to_string(),
            started_at: Instant::now(),
        });

        Ok(())
    }

    /// Report a start failure and return to a safe inactive state
    fn abort_start(&mut self, err: RecorderError) -> RecorderError {
        self.events.notify_error(&err);
        self.set_status(RecordingStatus::Inactive);
        err
    }

    /// Stop recording and publish the artifact.
    ///
    /// Status becomes `INACTIVE` immediately. With no engine running this is
    /// a no-op apart from the status and returns `Ok(None)`.
    pub async fn stop(&mut self) -> Result<Option<RecordedArtifact>> {
        self.set_status(RecordingStatus::Inactive);

        let Some(active) = self.active.take() else {
            debug!("Session {} stop with no active engine", self.handle);
            return Ok(None);
        };

        let ActiveCapture {
            mut engine,
            collector,
            mime,
            stream_id,
            started_at,
        } = active;

        info!("Session {} stopping capture of stream {}", self.handle, stream_id);
        if let Err(e) = engine.stop().await {
            warn!("Capture engine stopped with error: {}", e);
        }
        // Closes any sender the engine still holds
        drop(engine);

        let buffer = collector
            .await
            .map_err(|e| RecorderError::engine(format!("Chunk collector failed: {}", e)))?;

        let blob = buffer.assemble(mime.clone());
        let artifact = RecordedArtifact {
            size: blob.size(),
            chunk_count: buffer.len(),
            url: self.registry.create_object_url(blob),
            mime_type: mime,
            duration: started_at.elapsed(),
        };

        info!(
            "Session {} recorded {} bytes in {} fragments ({} empty dropped) as {}",
            self.handle,
            artifact.size,
            artifact.chunk_count,
            buffer.discarded(),
            artifact.url
        );

        // Publish the new reference before releasing the old one
        let previous = self.artifact.replace(artifact.clone());
        self.events.emit(SessionEvent::ArtifactReady {
            artifact: artifact.clone(),
        });
        if let Some(previous) = previous {
            self.registry.revoke(&previous.url);
        }
        self.recordings_completed += 1;

        Ok(Some(artifact))
    }

    /// Drop the shown artifact and reacquire devices without prompting
    pub async fn reset(&mut self) -> Result<DeviceStream> {
        info!("Session {} resetting to live preview", self.handle);
        self.clear_artifact();
        self.streams.acquire_live_stream(false).await
    }

    /// Wait for any background reacquisitions to finish
    pub async fn wait_for_acquisitions(&mut self) {
        for task in self.background.drain(..) {
            if let Err(e) = task.await {
                warn!("Background acquisition task failed: {}", e);
            }
        }
    }

    /// Current artifact, if a recording has finished since the last reset
    pub fn artifact(&self) -> Option<&RecordedArtifact> {
        self.artifact.as_ref()
    }

    /// Bytes of the current artifact
    pub fn artifact_blob(&self) -> Option<Blob> {
        self.artifact
            .as_ref()
            .and_then(|a| self.registry.resolve(&a.url))
    }

    /// Write the current artifact to `path`, or to the download directory
    /// under its suggested file name
    pub fn save_artifact(&self, path: Option<PathBuf>) -> Result<PathBuf> {
        let artifact = self.artifact.as_ref().ok_or(RecorderError::NoArtifact)?;
        let blob = self
            .registry
            .resolve(&artifact.url)
            .ok_or(RecorderError::NoArtifact)?;
        let path = path.unwrap_or_else(|| self.config.download_dir.join(artifact.file_name()));
        blob.write_to(&path)?;
        Ok(path)
    }

    /// Registry holding artifact references
    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Video-only stream for the live preview surface
    pub fn preview(&self) -> Option<MediaStream> {
        self.streams.preview()
    }

    /// Whether a live stream is held
    pub fn has_live_stream(&self) -> bool {
        self.streams.has_stream()
    }

    /// Whether device access has been granted at least once
    pub fn permission_granted(&self) -> bool {
        self.streams.permission_granted()
    }

    /// Check if a capture engine is running
    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session: self.handle.as_u64(),
            status: self.status,
            permission_granted: self.streams.permission_granted(),
            live_stream: self.streams.current().map(|s| s.id().to_string()),
            recording_mime: self.active.as_ref().map(|a| a.mime.clone()),
            recording_elapsed_ms: self
                .active
                .as_ref()
                .map(|a| a.started_at.elapsed().as_millis() as u64),
            artifact: self.artifact.clone(),
            recordings_completed: self.recordings_completed,
            acquisitions: self.streams.acquisition_count(),
        }
    }

    fn set_status(&mut self, status: RecordingStatus) {
        if self.status != status {
            debug!("Session {}: {} -> {}", self.handle, self.status, status);
            self.status = status;
            self.events.emit(SessionEvent::StatusChanged { status });
        }
    }

    fn clear_artifact(&mut self) {
        if let Some(artifact) = self.artifact.take() {
            self.events.emit(SessionEvent::ArtifactCleared);
            self.registry.revoke(&artifact.url);
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            warn!(
                "Session {} dropped while recording; discarding capture",
                self.handle
            );
            active.collector.abort();
        }
        for task in self.background.drain(..) {
            task.abort();
        }
    }
}

/// Session statistics
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Session handle value
    pub session: u64,
    /// Current status
    pub status: RecordingStatus,
    /// Whether device access was granted
    pub permission_granted: bool,
    /// Held stream id
    pub live_stream: Option<String>,
    /// Encoding of the running recording
    pub recording_mime: Option<MimeType>,
    /// Time since the running recording started
    pub recording_elapsed_ms: Option<u64>,
    /// Current artifact
    pub artifact: Option<RecordedArtifact>,
    /// Recordings finished in this session
    pub recordings_completed: u64,
    /// Device acquisitions started
    pub acquisitions: u64,
}

impl SessionStats {
    /// Elapsed time of the running recording
    pub fn recording_elapsed(&self) -> Option<Duration> {
        self.recording_elapsed_ms.map(Duration::from_millis)
    }
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Session {}: {} - permission {}, stream {}",
            self.session,
            self.status,
            if self.permission_granted {
                "granted"
            } else {
                "not granted"
            },
            self.live_stream.as_deref().unwrap_or("none")
        )?;
        if let (Some(mime), Some(elapsed)) = (&self.recording_mime, self.recording_elapsed()) {
            write!(f, ", recording {} for {:.1}s", mime, elapsed.as_secs_f64())?;
        }
        if let Some(artifact) = &self.artifact {
            write!(f, ", artifact {} ({} bytes)", artifact.url, artifact.size)?;
        }
        write!(
            f,
            ", {} recordings, {} acquisitions",
            self.recordings_completed, self.acquisitions
        )
    }
}
