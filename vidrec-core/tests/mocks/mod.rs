//! Mock infrastructure for testing
//!
//! Scripted device access and capture engines with call counters and
//! failure switches.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

use vidrec_core::capture::{CaptureBackend, CaptureEngine, ChunkSender, EngineState, MediaDevices, Runtime};
use vidrec_core::encoding::MimeType;
use vidrec_core::error::{RecorderError, Result};
use vidrec_core::event::SessionEvent;
use vidrec_core::types::{MediaConstraints, MediaStream, MediaTrack, TrackKind};

/// Device access that grants or refuses on command
#[derive(Default)]
pub struct MockDevices {
    deny: AtomicBool,
    camera_busy: AtomicBool,
    latency: Mutex<Duration>,
    requests: Mutex<Vec<MediaConstraints>>,
}

impl MockDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Devices that refuse every request
    pub fn denying() -> Arc<Self> {
        let devices = Self::new();
        devices.set_denied(true);
        devices
    }

    pub fn set_denied(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    pub fn set_camera_busy(&self, busy: bool) {
        self.camera_busy.store(busy, Ordering::SeqCst);
    }

    /// Delay every request by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Every request made so far, in order
    pub fn requests(&self) -> Vec<MediaConstraints> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl MediaDevices for MockDevices {
    async fn get_user_media(&self, constraints: MediaConstraints) -> Result<MediaStream> {
        self.requests.lock().push(constraints);

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.deny.load(Ordering::SeqCst) {
            return Err(RecorderError::denied("Permission denied"));
        }
        if constraints.video && self.camera_busy.load(Ordering::SeqCst) {
            return Err(RecorderError::device("Could not start video source"));
        }

        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(MediaTrack::new(TrackKind::Video, "Mock Camera"));
        }
        if constraints.audio {
            tracks.push(MediaTrack::new(TrackKind::Audio, "Mock Microphone"));
        }
        Ok(MediaStream::from_tracks(tracks))
    }
}

/// Fragment produced by [`ScriptedEngine`]: `size` bytes of `fill`
pub fn fragment(fill: u8, size: usize) -> Bytes {
    Bytes::from(vec![fill; size])
}

/// Capture backend that creates engines replaying a fixed fragment script
pub struct MockBackend {
    available: AtomicBool,
    type_query: AtomicBool,
    supported: Mutex<Vec<String>>,
    script: Mutex<Vec<usize>>,
    flush: Mutex<usize>,
    fail_create: AtomicBool,
    engines_created: AtomicUsize,
    last_stream: Mutex<Option<String>>,
    last_mime: Mutex<Option<MimeType>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            type_query: AtomicBool::new(true),
            supported: Mutex::new(vec!["video/webm".to_string()]),
            script: Mutex::new(vec![10, 20]),
            flush: Mutex::new(0),
            fail_create: AtomicBool::new(false),
            engines_created: AtomicUsize::new(0),
            last_stream: Mutex::new(None),
            last_mime: Mutex::new(None),
        }
    }
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose engines emit fragments of these sizes on start.
    ///
    /// Fragment `i` is filled with byte `i + 1`.
    pub fn with_script(sizes: &[usize]) -> Arc<Self> {
        let backend = Self::new();
        backend.set_script(sizes);
        backend
    }

    pub fn set_script(&self, sizes: &[usize]) {
        *self.script.lock() = sizes.to_vec();
    }

    /// Size of the final fragment sent on stop (0 = empty fragment)
    pub fn set_flush(&self, size: usize) {
        *self.flush.lock() = size;
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_type_query(&self, type_query: bool) {
        self.type_query.store(type_query, Ordering::SeqCst);
    }

    pub fn set_supported(&self, supported: &[&str]) {
        *self.supported.lock() = supported.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn engines_created(&self) -> usize {
        self.engines_created.load(Ordering::SeqCst)
    }

    /// Stream id the last engine was bound to
    pub fn last_stream(&self) -> Option<String> {
        self.last_stream.lock().clone()
    }

    /// Encoding the last engine was created with
    pub fn last_mime(&self) -> Option<MimeType> {
        self.last_mime.lock().clone()
    }
}

impl CaptureBackend for MockBackend {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn supports_type_query(&self) -> bool {
        self.type_query.load(Ordering::SeqCst)
    }

    fn is_type_supported(&self, mime: &MimeType) -> bool {
        self.supported.lock().iter().any(|s| s == mime.as_str())
    }

    fn create_engine(&self, stream: &MediaStream, mime: &MimeType) -> Result<Box<dyn CaptureEngine>> {
        if !self.is_available() {
            return Err(RecorderError::unsupported("Capture is not supported by this runtime."));
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RecorderError::engine("Engine creation failed"));
        }

        self.engines_created.fetch_add(1, Ordering::SeqCst);
        *self.last_stream.lock() = Some(stream.id.clone());
        *self.last_mime.lock() = Some(mime.clone());

        Ok(Box::new(ScriptedEngine {
            mime: mime.clone(),
            script: self.script.lock().clone(),
            flush: *self.flush.lock(),
            state: EngineState::Inactive,
            sink: None,
        }))
    }
}

/// Engine that sends its whole script on start and one flush fragment on stop
pub struct ScriptedEngine {
    mime: MimeType,
    script: Vec<usize>,
    flush: usize,
    state: EngineState,
    sink: Option<ChunkSender>,
}

#[async_trait]
impl CaptureEngine for ScriptedEngine {
    fn mime_type(&self) -> &MimeType {
        &self.mime
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn start(&mut self, sink: ChunkSender) -> Result<()> {
        for (i, size) in self.script.iter().enumerate() {
            sink.send(fragment(i as u8 + 1, *size))
                .map_err(|_| RecorderError::engine("Sink closed"))?;
        }
        self.sink = Some(sink);
        self.state = EngineState::Recording;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.take() {
            let _ = sink.send(fragment(0xFF, self.flush));
        }
        self.state = EngineState::Stopped;
        Ok(())
    }
}

/// Runtime over the given mocks
pub fn mock_runtime(devices: &Arc<MockDevices>, backend: &Arc<MockBackend>) -> Runtime {
    Runtime::new(devices.clone(), backend.clone())
}

/// Every event received so far
pub fn drain_events(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
