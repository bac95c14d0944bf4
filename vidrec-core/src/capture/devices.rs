//! Device access seam
//!
//! Requests camera/microphone input with explicit constraints. Implementations
//! map a user dismissal or refusal to `PermissionDenied`, a missing API to
//! `UnsupportedRuntime`, and anything else to `DeviceUnavailable`.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{MediaConstraints, MediaStream};

/// The runtime's device access API
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a live stream matching `constraints`.
    ///
    /// May wait indefinitely on a permission prompt.
    async fn get_user_media(&self, constraints: MediaConstraints) -> Result<MediaStream>;
}
