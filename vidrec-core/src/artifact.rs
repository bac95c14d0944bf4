//! Recorded artifacts and their local references
//!
//! A finished recording is one blob tagged with its media type. Blobs are
//! registered in an [`ArtifactRegistry`] which hands out `blob:` URLs the
//! shell can use for playback and download, the same way object URLs work in
//! a browser.

use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::encoding::MimeType;
use crate::error::Result;

/// URL scheme prefix for artifact references
pub const URL_PREFIX: &str = "blob:vidrec/";

/// Immutable binary object with a media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    mime: MimeType,
}

impl Blob {
    /// Concatenate parts, in order, into one blob
    pub fn from_parts<'a>(parts: impl IntoIterator<Item = &'a Bytes>, mime: MimeType) -> Self {
        let mut buf = BytesMut::new();
        for part in parts {
            buf.extend_from_slice(part);
        }
        Self {
            data: buf.freeze(),
            mime,
        }
    }

    /// Blob contents
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Media type tag
    pub fn mime_type(&self) -> &MimeType {
        &self.mime
    }

    /// Size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the blob holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write the blob to a file (the "download" affordance)
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, &self.data)?;
        info!("Wrote {} bytes to {:?}", self.data.len(), path);
        Ok(())
    }
}

/// Locally addressable reference to a registered blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ArtifactUrl(String);

impl ArtifactUrl {
    fn generate() -> Self {
        Self(format!("{}{}", URL_PREFIX, Uuid::new_v4()))
    }

    /// Raw URL string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Object-URL store for blobs produced in this process
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    entries: Arc<RwLock<HashMap<ArtifactUrl, Blob>>>,
}

impl ArtifactRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and return its reference
    pub fn create_object_url(&self, blob: Blob) -> ArtifactUrl {
        let url = ArtifactUrl::generate();
        debug!("Registered {} ({} bytes)", url, blob.size());
        self.entries.write().insert(url.clone(), blob);
        url
    }

    /// Look up a blob; revoked references resolve to nothing
    pub fn resolve(&self, url: &ArtifactUrl) -> Option<Blob> {
        self.entries.read().get(url).cloned()
    }

    /// Release a reference. Returns whether it was registered.
    pub fn revoke(&self, url: &ArtifactUrl) -> bool {
        let removed = self.entries.write().remove(url).is_some();
        if removed {
            debug!("Revoked {}", url);
        }
        removed
    }

    /// Number of live references
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no references are live
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// The current finished recording, as shown to the shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedArtifact {
    /// Reference for playback/download
    pub url: ArtifactUrl,
    /// Media type the recording was tagged with
    pub mime_type: MimeType,
    /// Total size in bytes
    pub size: usize,
    /// Number of non-empty fragments concatenated
    pub chunk_count: usize,
    /// Wall-clock time between start and stop
    #[serde(serialize_with = "serialize_duration_ms", rename = "duration_ms")]
    pub duration: Duration,
}

impl RecordedArtifact {
    /// Suggested file name for downloads
    pub fn file_name(&self) -> String {
        format!("recording.{}", self.mime_type.file_extension())
    }
}

fn serialize_duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
