//! Encoding identifiers and capability negotiation
//!
//! Centralizes the container/codec identifiers understood by capture engines
//! and picks the one the active backend can record.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::capture::CaptureBackend;

/// Preference-ordered candidate identifiers
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "video/webm;codecs=\"vp8,opus\"",
    "video/webm;codecs=h264",
    "video/webm;codecs=vp9",
    "video/webm",
    "video/mp4",
];

/// Used when the backend cannot answer support queries at all
pub const FALLBACK_MIME_TYPE: &str = "video/webm";

/// Encoding identifier: a container media type with optional codecs
/// parameter, e.g. `video/webm;codecs="vp8,opus"`.
///
/// An empty identifier means "let the engine decide".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MimeType(String);

impl MimeType {
    /// Wrap a raw identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    /// The empty identifier
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Raw identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty identifier
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Media type without parameters, lowercased (`video/webm`)
    pub fn essence(&self) -> String {
        self.0
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    /// Container subtype (`webm`, `mp4`), if present
    pub fn container(&self) -> Option<String> {
        let essence = self.essence();
        let (_, subtype) = essence.split_once('/')?;
        if subtype.is_empty() {
            None
        } else {
            Some(subtype.to_string())
        }
    }

    /// Codecs listed in the `codecs` parameter, in order
    pub fn codecs(&self) -> Vec<String> {
        self.0
            .split(';')
            .skip(1)
            .filter_map(|param| {
                let (key, value) = param.split_once('=')?;
                if key.trim().eq_ignore_ascii_case("codecs") {
                    Some(value.trim().trim_matches('"').to_string())
                } else {
                    None
                }
            })
            .flat_map(|list| {
                list.split(',')
                    .map(|c| c.trim().to_ascii_lowercase())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// File extension for downloads of this type
    pub fn file_extension(&self) -> &'static str {
        match self.container().as_deref() {
            Some("webm") => "webm",
            Some("mp4") => "mp4",
            Some("x-matroska") | Some("matroska") => "mkv",
            Some("ogg") => "ogv",
            Some("quicktime") => "mov",
            _ => "bin",
        }
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            write!(f, "(engine default)")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for MimeType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MimeType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Picks the encoding for a new recording from a preference-ordered list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityNegotiator {
    candidates: Vec<MimeType>,
    fallback: Option<MimeType>,
}

impl Default for CapabilityNegotiator {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATES.iter().map(|c| MimeType::new(*c)).collect(),
            fallback: Some(MimeType::new(FALLBACK_MIME_TYPE)),
        }
    }
}

impl CapabilityNegotiator {
    /// Create a negotiator with explicit candidates and fallback
    pub fn new(candidates: Vec<MimeType>, fallback: Option<MimeType>) -> Self {
        Self {
            candidates,
            fallback: fallback.filter(|f| !f.is_empty()),
        }
    }

    /// Candidate identifiers in preference order
    pub fn candidates(&self) -> &[MimeType] {
        &self.candidates
    }

    /// Fallback identifier used without a support query
    pub fn fallback(&self) -> Option<&MimeType> {
        self.fallback.as_ref()
    }

    /// Select the encoding for the next recording.
    ///
    /// Returns the first candidate the backend supports. A backend that
    /// cannot be queried gets the fallback. No match yields the empty
    /// identifier.
    pub fn select_encoding(&self, backend: &dyn CaptureBackend) -> MimeType {
        if !backend.supports_type_query() {
            let chosen = self.fallback.clone().unwrap_or_default();
            debug!("Backend has no type query, using fallback {}", chosen);
            return chosen;
        }

        for candidate in &self.candidates {
            let supported = backend.is_type_supported(candidate);
            trace!("Encoding candidate {} supported: {}", candidate, supported);
            if supported {
                debug!("Selected encoding {}", candidate);
                return candidate.clone();
            }
        }

        debug!("No encoding candidate supported, leaving choice to the engine");
        MimeType::empty()
    }
}
