//! Device capture
//!
//! This module handles:
//! - The runtime seam (device access and capture engines)
//! - Live stream acquisition and permission state

pub mod devices;
pub mod engine;
pub mod stream;

pub use devices::MediaDevices;
pub use engine::{CaptureBackend, CaptureEngine, ChunkReceiver, ChunkSender, EngineState};
pub use stream::{DeviceStreamManager, merge_streams};

use std::sync::Arc;

/// A complete runtime: device access plus a recording subsystem
#[derive(Clone)]
pub struct Runtime {
    /// Camera and microphone access
    pub devices: Arc<dyn MediaDevices>,
    /// Capture engine factory and capability queries
    pub backend: Arc<dyn CaptureBackend>,
}

impl Runtime {
    /// Bundle a device API and a backend
    pub fn new(devices: Arc<dyn MediaDevices>, backend: Arc<dyn CaptureBackend>) -> Self {
        Self { devices, backend }
    }
}
