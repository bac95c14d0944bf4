//! Configuration types for vidrec
//!
//! Provides the runtime session configuration and the on-disk config file.

mod file;

pub use file::{ConfigFile, EncodingSettings, SessionSettings, SyntheticSettings, sample_config};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::encoding::{CapabilityNegotiator, DEFAULT_CANDIDATES, FALLBACK_MIME_TYPE, MimeType};

/// How `start()` orders stream reacquisition and engine binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReacquireMode {
    /// Wait for the fresh stream, then bind the engine to it
    #[default]
    Sequenced,
    /// Start the reacquisition in the background and bind the engine to the
    /// stream held right now. Which stream gets recorded depends on timing.
    Concurrent,
}

impl std::fmt::Display for ReacquireMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequenced => write!(f, "sequenced"),
            Self::Concurrent => write!(f, "concurrent"),
        }
    }
}

impl std::str::FromStr for ReacquireMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequenced" | "sequential" | "await" => Ok(Self::Sequenced),
            "concurrent" | "parallel" | "race" => Ok(Self::Concurrent),
            _ => Err(format!("Unknown reacquire mode: {}", s)),
        }
    }
}

/// Complete session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Encoding candidates in preference order
    pub candidates: Vec<MimeType>,
    /// Encoding used when the backend has no type query
    pub fallback: Option<MimeType>,
    /// Start/reacquire ordering
    pub reacquire: ReacquireMode,
    /// Directory downloads are written to
    pub download_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES.iter().map(|c| MimeType::new(*c)).collect(),
            fallback: Some(MimeType::new(FALLBACK_MIME_TYPE)),
            reacquire: ReacquireMode::default(),
            download_dir: PathBuf::from("."),
        }
    }
}

impl SessionConfig {
    /// Build a session config from a loaded config file
    pub fn from_file(file: &ConfigFile) -> Self {
        let candidates = file
            .encoding
            .candidates
            .iter()
            .map(|c| MimeType::new(c.as_str()))
            .collect();
        let fallback = Some(MimeType::new(file.encoding.fallback.as_str())).filter(|f| !f.is_empty());
        let reacquire = file.session.reacquire.parse().unwrap_or_else(|e| {
            tracing::warn!("{}, using {}", e, ReacquireMode::default());
            ReacquireMode::default()
        });

        Self {
            candidates,
            fallback,
            reacquire,
            download_dir: file.session.download_dir.clone(),
        }
    }

    /// Set the encoding candidates
    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MimeType>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Set or clear the fallback encoding
    pub fn with_fallback(mut self, fallback: Option<MimeType>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the reacquire mode
    pub fn with_reacquire(mut self, mode: ReacquireMode) -> Self {
        self.reacquire = mode;
        self
    }

    /// Set the download directory
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Negotiator for this configuration
    pub fn negotiator(&self) -> CapabilityNegotiator {
        CapabilityNegotiator::new(self.candidates.clone(), self.fallback.clone())
    }

    /// Validate the configuration and return any warnings
    ///
    /// An empty list means the configuration looks good.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.candidates.is_empty() {
            warnings.push(
                "No encoding candidates configured; the engine default will be used.".to_string(),
            );
        }

        if self.fallback.is_none() {
            warnings.push(
                "No fallback encoding; backends without type queries will use the engine default."
                    .to_string(),
            );
        }

        if self.reacquire == ReacquireMode::Concurrent {
            warnings.push(
                "Concurrent reacquire mode may record the previous stream instead of the fresh one."
                    .to_string(),
            );
        }

        warnings
    }

    /// Validate and return an error if configuration is invalid
    pub fn validate_strict(&self) -> Result<(), String> {
        for mime in self.candidates.iter().chain(self.fallback.iter()) {
            if mime.is_empty() {
                return Err("Encoding candidates cannot be empty strings".to_string());
            }
            if mime.container().is_none() {
                return Err(format!(
                    "Encoding '{}' is not a media type (expected type/subtype)",
                    mime.as_str()
                ));
            }
        }

        Ok(())
    }
}
