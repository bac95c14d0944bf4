//! Synthetic runtime
//!
//! Test-pattern devices and a timed capture engine, for running the session
//! without camera or microphone hardware. Failure modes (denied permission,
//! missing capture API, busy camera, no type query) can be switched on to
//! exercise the error paths.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::capture::{CaptureBackend, CaptureEngine, ChunkSender, EngineState, MediaDevices, Runtime};
use crate::config::SyntheticSettings;
use crate::encoding::MimeType;
use crate::error::{RecorderError, Result};
use crate::types::{MediaConstraints, MediaStream, MediaTrack, TrackKind};

/// EBML magic that opens every WebM file
const WEBM_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Behaviour switches for the synthetic runtime
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    /// Reject every device request as if the user dismissed the prompt
    pub deny_permission: bool,
    /// Whether the runtime has a capture API
    pub capture_available: bool,
    /// Whether the capture API can answer type queries
    pub type_query: bool,
    /// Fail camera requests as if the device were in use
    pub camera_busy: bool,
    /// Types the engine can record
    pub supported_types: Vec<MimeType>,
    /// Interval between fragments
    pub timeslice: Duration,
    /// Bytes per full fragment
    pub fragment_size: usize,
    /// Delay applied to every device request
    pub device_latency: Duration,
    /// Label of the synthetic camera
    pub camera_label: String,
    /// Label of the synthetic microphone
    pub microphone_label: String,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self::from_settings(&SyntheticSettings::default())
    }
}

impl SyntheticOptions {
    /// Options from the `[synthetic]` config section
    pub fn from_settings(settings: &SyntheticSettings) -> Self {
        Self {
            deny_permission: false,
            capture_available: true,
            type_query: true,
            camera_busy: false,
            supported_types: settings
                .supported_types
                .iter()
                .map(|t| MimeType::new(t.as_str()))
                .collect(),
            timeslice: Duration::from_millis(settings.timeslice_ms.max(1)),
            fragment_size: settings.fragment_size,
            device_latency: Duration::from_millis(settings.device_latency_ms),
            camera_label: "Synthetic Camera".to_string(),
            microphone_label: "Synthetic Microphone".to_string(),
        }
    }
}

/// Device access and capture backend backed by generated data
#[derive(Debug, Clone)]
pub struct SyntheticRuntime {
    options: Arc<SyntheticOptions>,
    device_requests: Arc<AtomicU64>,
}

impl Default for SyntheticRuntime {
    fn default() -> Self {
        Self::new(SyntheticOptions::default())
    }
}

impl SyntheticRuntime {
    /// Create a runtime with the given options
    pub fn new(options: SyntheticOptions) -> Self {
        Self {
            options: Arc::new(options),
            device_requests: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Options in effect
    pub fn options(&self) -> &SyntheticOptions {
        &self.options
    }

    /// Number of device requests served or refused
    pub fn device_requests(&self) -> u64 {
        self.device_requests.load(Ordering::SeqCst)
    }

    /// Use this runtime for both device access and capture
    pub fn into_runtime(self) -> Runtime {
        let shared = Arc::new(self);
        Runtime::new(shared.clone(), shared)
    }
}

#[async_trait]
impl MediaDevices for SyntheticRuntime {
    async fn get_user_media(&self, constraints: MediaConstraints) -> Result<MediaStream> {
        self.device_requests.fetch_add(1, Ordering::SeqCst);
        if !self.options.device_latency.is_zero() {
            tokio::time::sleep(self.options.device_latency).await;
        }

        if !constraints.audio && !constraints.video {
            return Err(RecorderError::device(
                "At least one of audio and video must be requested",
            ));
        }
        if self.options.deny_permission {
            return Err(RecorderError::denied("Permission denied"));
        }
        if constraints.video && self.options.camera_busy {
            return Err(RecorderError::device("Could not start video source"));
        }

        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(MediaTrack::new(TrackKind::Video, &self.options.camera_label));
        }
        if constraints.audio {
            tracks.push(MediaTrack::new(TrackKind::Audio, &self.options.microphone_label));
        }

        trace!("Synthetic devices granted {} with {} tracks", constraints, tracks.len());
        Ok(MediaStream::from_tracks(tracks))
    }
}

impl CaptureBackend for SyntheticRuntime {
    fn is_available(&self) -> bool {
        self.options.capture_available
    }

    fn supports_type_query(&self) -> bool {
        self.options.capture_available && self.options.type_query
    }

    fn is_type_supported(&self, mime: &MimeType) -> bool {
        self.options
            .supported_types
            .iter()
            .any(|t| t.essence() == mime.essence() && t.codecs() == mime.codecs())
    }

    fn create_engine(&self, stream: &MediaStream, mime: &MimeType) -> Result<Box<dyn CaptureEngine>> {
        if !self.options.capture_available {
            return Err(RecorderError::unsupported(
                "Capture is not supported by this runtime.",
            ));
        }
        if stream.tracks.is_empty() {
            return Err(RecorderError::engine("Stream has no tracks to record"));
        }

        // The engine picks its first supported type when asked for none
        let mime = if mime.is_empty() {
            self.options.supported_types.first().cloned().unwrap_or_default()
        } else if self.is_type_supported(mime) {
            mime.clone()
        } else {
            return Err(RecorderError::engine(format!(
                "Unsupported MIME type: {}",
                mime.as_str()
            )));
        };

        Ok(Box::new(SyntheticEngine::new(
            stream.id.clone(),
            mime,
            self.options.timeslice,
            self.options.fragment_size,
        )))
    }
}

/// Capture engine producing a fixed-size fragment every timeslice
pub struct SyntheticEngine {
    stream_id: String,
    mime: MimeType,
    timeslice: Duration,
    fragment_size: usize,
    state: EngineState,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<u64>>,
}

impl SyntheticEngine {
    /// Create an engine for the given stream id
    pub fn new(stream_id: String, mime: MimeType, timeslice: Duration, fragment_size: usize) -> Self {
        Self {
            stream_id,
            mime,
            timeslice,
            fragment_size,
            state: EngineState::Inactive,
            stop_tx: None,
            task: None,
        }
    }
}

#[async_trait]
impl CaptureEngine for SyntheticEngine {
    fn mime_type(&self) -> &MimeType {
        &self.mime
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn start(&mut self, sink: ChunkSender) -> Result<()> {
        if self.state != EngineState::Inactive {
            return Err(RecorderError::engine("Engine can only be started once"));
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let header = container_header(&self.mime);
        let task = tokio::spawn(produce(
            sink,
            stop_rx,
            header,
            self.timeslice,
            self.fragment_size,
        ));

        debug!(
            "Synthetic engine recording stream {} as {}",
            self.stream_id, self.mime
        );
        self.stop_tx = Some(stop_tx);
        self.task = Some(task);
        self.state = EngineState::Recording;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if self.state != EngineState::Recording {
            self.state = EngineState::Stopped;
            return Ok(());
        }
        self.state = EngineState::Stopped;

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(fragments) => debug!("Synthetic engine flushed after {} fragments", fragments),
                Err(e) => {
                    warn!("Synthetic engine task failed: {}", e);
                    return Err(RecorderError::engine(format!("Engine task failed: {}", e)));
                }
            }
        }
        Ok(())
    }
}

/// Emit a fragment per tick until stopped, then flush the partial fragment.
///
/// The final flush is proportional to the time since the last tick, so an
/// immediate stop produces an empty fragment.
async fn produce(
    sink: ChunkSender,
    mut stop_rx: oneshot::Receiver<()>,
    header: Bytes,
    timeslice: Duration,
    fragment_size: usize,
) -> u64 {
    let mut interval = tokio::time::interval_at(Instant::now() + timeslice, timeslice);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut sequence: u64 = 0;
    let mut last_tick = Instant::now();
    let mut pending_header = Some(header);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = interval.tick() => {
                last_tick = Instant::now();
                let chunk = fragment(pending_header.take(), sequence, fragment_size);
                sequence += 1;
                if sink.send(chunk).is_err() {
                    debug!("Fragment receiver gone, stopping synthetic engine");
                    return sequence;
                }
            }
        }
    }

    let since_tick = last_tick.elapsed().min(timeslice);
    let partial = (fragment_size as u128 * since_tick.as_nanos() / timeslice.as_nanos().max(1)) as usize;
    let last = if partial == 0 && pending_header.is_none() {
        Bytes::new()
    } else {
        fragment(pending_header.take(), sequence, partial)
    };
    let _ = sink.send(last);
    sequence + 1
}

/// Build one fragment: optional container header plus a sequence pattern
fn fragment(header: Option<Bytes>, sequence: u64, size: usize) -> Bytes {
    let header_len = header.as_ref().map_or(0, Bytes::len);
    let mut buf = BytesMut::with_capacity(header_len + size);
    if let Some(header) = header {
        buf.put(header);
    }
    let seed = sequence.to_le_bytes();
    for i in 0..size {
        buf.put_u8(seed[i % seed.len()] ^ (i as u8));
    }
    buf.freeze()
}

/// Leading bytes identifying the container of `mime`
fn container_header(mime: &MimeType) -> Bytes {
    match mime.container().as_deref() {
        Some("webm") => Bytes::from_static(&WEBM_MAGIC),
        Some("mp4") => Bytes::from_static(b"\x00\x00\x00\x18ftypmp42"),
        _ => Bytes::new(),
    }
}
