//! Capture engine seam
//!
//! A capture engine consumes a live stream and produces encoded fragments
//! over time. Backends create engines and answer capability queries.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::encoding::MimeType;
use crate::error::Result;
use crate::types::MediaStream;

/// Where an engine delivers its fragments, in production order
pub type ChunkSender = mpsc::UnboundedSender<Bytes>;

/// Receiving half owned by the session's chunk collector
pub type ChunkReceiver = mpsc::UnboundedReceiver<Bytes>;

/// Lifecycle of a single engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, not yet started
    Inactive,
    /// Producing fragments
    Recording,
    /// Stopped and flushed; cannot be restarted
    Stopped,
}

/// A running (or runnable) capture engine bound to one stream and encoding
#[async_trait]
pub trait CaptureEngine: Send {
    /// Encoding the engine was created with
    fn mime_type(&self) -> &MimeType;

    /// Current engine state
    fn state(&self) -> EngineState;

    /// Begin capture. Every fragment is sent to `sink`, including empty ones;
    /// filtering is the receiver's job.
    fn start(&mut self, sink: ChunkSender) -> Result<()>;

    /// Signal the engine to stop.
    ///
    /// Resolves once the final fragment has been sent and the sink has been
    /// dropped. This is the single completion signal for the recording.
    async fn stop(&mut self) -> Result<()>;
}

/// The runtime's recording subsystem
pub trait CaptureBackend: Send + Sync {
    /// Whether the runtime has a capture API at all
    fn is_available(&self) -> bool;

    /// Whether `is_type_supported` can be asked
    fn supports_type_query(&self) -> bool;

    /// Whether the engine can record the given identifier
    fn is_type_supported(&self, mime: &MimeType) -> bool;

    /// Create an engine bound to `stream`. An empty `mime` lets the engine
    /// pick its own default.
    fn create_engine(&self, stream: &MediaStream, mime: &MimeType) -> Result<Box<dyn CaptureEngine>>;
}
