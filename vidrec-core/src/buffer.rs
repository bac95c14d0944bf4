//! Chunk buffering for one recording
//!
//! The capture engine sends fragments over an unbounded channel; a single
//! collector task drains it into a [`ChunkBuffer`]. That task is the only
//! writer, and it hands the finished buffer back when the engine drops its
//! sender.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::artifact::Blob;
use crate::capture::{ChunkReceiver, ChunkSender};
use crate::encoding::MimeType;

/// Ordered, append-only sequence of non-empty fragments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkBuffer {
    chunks: Vec<Bytes>,
    /// Empty fragments seen and dropped
    discarded: usize,
}

impl ChunkBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments are dropped; returns whether the
    /// fragment was kept.
    pub fn push(&mut self, chunk: Bytes) -> bool {
        if chunk.is_empty() {
            self.discarded += 1;
            trace!("Discarding empty fragment");
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    /// Fragments in arrival order
    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Number of kept fragments
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no fragment was kept
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total bytes kept
    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    /// Number of empty fragments dropped
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Concatenate everything into one blob tagged with `mime`
    pub fn assemble(&self, mime: MimeType) -> Blob {
        Blob::from_parts(self.chunks.iter(), mime)
    }
}

/// Create a fragment channel and spawn its collector.
///
/// The join handle resolves to the filled buffer once every sender is gone.
pub fn spawn_collector() -> (ChunkSender, JoinHandle<ChunkBuffer>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(collect(rx));
    (tx, handle)
}

async fn collect(mut rx: ChunkReceiver) -> ChunkBuffer {
    let mut buffer = ChunkBuffer::new();
    while let Some(chunk) = rx.recv().await {
        buffer.push(chunk);
    }
    trace!(
        "Collector finished: {} fragments, {} discarded",
        buffer.len(),
        buffer.discarded()
    );
    buffer
}
