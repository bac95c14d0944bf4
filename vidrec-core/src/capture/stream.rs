//! Device stream management
//!
//! Acquires microphone and camera input as two independent requests and
//! merges them into the single stream the capture engine records. The
//! camera-only stream is kept separately for the live preview surface.
//!
//! The manager is the only writer of the held stream. It is cheap to clone,
//! so an acquisition can run as its own task while the session keeps going.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

use crate::capture::{CaptureBackend, MediaDevices};
use crate::error::{RecorderError, Result, ResultExt};
use crate::event::{EventSender, SessionEvent};
use crate::types::{DeviceStream, MediaConstraints, MediaStream, TrackKind};

/// Message shown when the runtime has no capture API
pub const UNSUPPORTED_RUNTIME_MESSAGE: &str = "Capture is not supported by this runtime.";

/// Shared state behind every clone of the manager
struct Inner {
    devices: Arc<dyn MediaDevices>,
    backend: Arc<dyn CaptureBackend>,
    events: EventSender,
    /// Currently held stream; replaced only on successful acquisition
    stream: RwLock<Option<DeviceStream>>,
    /// Set once access has been granted; never cleared
    permission: AtomicBool,
    /// Number of acquisitions started
    acquisitions: AtomicU64,
}

/// Owns the live device stream and the permission state
#[derive(Clone)]
pub struct DeviceStreamManager {
    inner: Arc<Inner>,
}

impl DeviceStreamManager {
    /// Create a manager over the given runtime
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        backend: Arc<dyn CaptureBackend>,
        events: EventSender,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                devices,
                backend,
                events,
                stream: RwLock::new(None),
                permission: AtomicBool::new(false),
                acquisitions: AtomicU64::new(0),
            }),
        }
    }

    /// Ask for combined audio+video access to validate support and surface
    /// the grant/deny outcome. The returned stream is discarded.
    ///
    /// Failures are reported to the user and leave the permission state as
    /// it was.
    pub async fn request_permissions(&self) -> Result<()> {
        match self.probe_permissions().await {
            Ok(()) => {
                if !self.inner.permission.swap(true, Ordering::SeqCst) {
                    info!("Device access granted");
                    self.inner
                        .events
                        .emit(SessionEvent::PermissionChanged { granted: true });
                }
                Ok(())
            }
            Err(e) => {
                self.inner.events.notify_error(&e);
                Err(e)
            }
        }
    }

    async fn probe_permissions(&self) -> Result<()> {
        if !self.inner.backend.is_available() {
            return Err(RecorderError::unsupported(UNSUPPORTED_RUNTIME_MESSAGE));
        }

        let probe = self
            .inner
            .devices
            .get_user_media(MediaConstraints::AUDIO_VIDEO)
            .await?;
        debug!(
            "Permission probe returned stream {} with {} tracks, discarding",
            probe.id,
            probe.tracks.len()
        );
        Ok(())
    }

    /// Acquire fresh microphone and camera streams and publish the merged
    /// result as the held stream.
    ///
    /// With `prompt_for_permission`, a permission request runs first; its
    /// outcome is reported but does not stop the acquisition. On failure the
    /// error is reported and the previously held stream stays in place.
    pub async fn acquire_live_stream(&self, prompt_for_permission: bool) -> Result<DeviceStream> {
        let attempt = self.inner.acquisitions.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Acquiring live stream (attempt {}, prompt: {})",
            attempt, prompt_for_permission
        );

        if prompt_for_permission {
            // Already reported to the user inside request_permissions
            let _ = self.request_permissions().await;
        }

        match self.acquire_tracks().await {
            Ok(stream) => {
                let preview_tracks = stream.preview.tracks.len();
                let stream_id = stream.id().to_string();
                *self.inner.stream.write() = Some(stream.clone());
                info!(
                    "Live stream {} ready ({} preview tracks)",
                    stream_id, preview_tracks
                );
                self.inner.events.emit(SessionEvent::StreamAcquired {
                    stream_id,
                    preview_tracks,
                });
                Ok(stream)
            }
            Err(e) => {
                self.inner.events.notify_error(&e);
                Err(e)
            }
        }
    }

    async fn acquire_tracks(&self) -> Result<DeviceStream> {
        let audio = self
            .inner
            .devices
            .get_user_media(MediaConstraints::AUDIO_ONLY)
            .await
            .context("Acquiring microphone")?;
        let video = self
            .inner
            .devices
            .get_user_media(MediaConstraints::VIDEO_ONLY)
            .await
            .context("Acquiring camera")?;

        merge_streams(&audio, &video)
    }

    /// Currently held stream, if any
    pub fn current(&self) -> Option<DeviceStream> {
        self.inner.stream.read().clone()
    }

    /// Video-only stream for the live preview surface
    pub fn preview(&self) -> Option<MediaStream> {
        self.inner.stream.read().as_ref().map(|s| s.preview.clone())
    }

    /// Whether a live stream is held
    pub fn has_stream(&self) -> bool {
        self.inner.stream.read().is_some()
    }

    /// Whether device access has been granted at least once
    pub fn permission_granted(&self) -> bool {
        self.inner.permission.load(Ordering::SeqCst)
    }

    /// Number of acquisitions started so far
    pub fn acquisition_count(&self) -> u64 {
        self.inner.acquisitions.load(Ordering::SeqCst)
    }

    /// The capture backend this manager validates against
    pub fn backend(&self) -> &Arc<dyn CaptureBackend> {
        &self.inner.backend
    }

    /// Event channel shared with the session
    pub fn events(&self) -> &EventSender {
        &self.inner.events
    }
}

/// Merge one camera track and one microphone track into a capture stream.
///
/// Either both tracks are present or the merge fails; a half stream is never
/// produced.
pub fn merge_streams(audio: &MediaStream, video: &MediaStream) -> Result<DeviceStream> {
    let video_track = video
        .video_tracks()
        .next()
        .cloned()
        .ok_or_else(|| RecorderError::device("No camera track available"))?;
    let audio_track = audio
        .audio_tracks()
        .next()
        .cloned()
        .ok_or_else(|| RecorderError::device("No microphone track available"))?;

    let preview = MediaStream {
        id: video.id.clone(),
        tracks: video
            .tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Video)
            .cloned()
            .collect(),
    };

    Ok(DeviceStream {
        combined: MediaStream::from_tracks(vec![video_track, audio_track]),
        preview,
    })
}
