//! Configuration file loading and merging
//!
//! Loads user configuration from `~/.config/vidrec/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::encoding::{DEFAULT_CANDIDATES, FALLBACK_MIME_TYPE};
use crate::error::{RecorderError, Result};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Encoding negotiation settings
    #[serde(default)]
    pub encoding: EncodingSettings,

    /// Session behaviour
    #[serde(default)]
    pub session: SessionSettings,

    /// Synthetic runtime settings
    #[serde(default)]
    pub synthetic: SyntheticSettings,
}

/// Encoding negotiation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingSettings {
    /// Candidate media types in preference order
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,

    /// Media type used when the backend cannot be queried ("" = none)
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

/// Session behaviour settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Start/reacquire ordering: sequenced or concurrent
    #[serde(default = "default_reacquire")]
    pub reacquire: String,

    /// Directory recordings are saved to
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

/// Synthetic runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSettings {
    /// Interval between produced fragments in milliseconds
    #[serde(default = "default_timeslice_ms")]
    pub timeslice_ms: u64,

    /// Size of each produced fragment in bytes
    #[serde(default = "default_fragment_size")]
    pub fragment_size: usize,

    /// Media types the synthetic engine reports as supported
    #[serde(default = "default_supported_types")]
    pub supported_types: Vec<String>,

    /// Simulated delay for each device request in milliseconds
    #[serde(default)]
    pub device_latency_ms: u64,
}

fn default_candidates() -> Vec<String> {
    DEFAULT_CANDIDATES.iter().map(|c| c.to_string()).collect()
}

fn default_fallback() -> String {
    FALLBACK_MIME_TYPE.to_string()
}

fn default_reacquire() -> String {
    "sequenced".to_string()
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_timeslice_ms() -> u64 {
    250
}

fn default_fragment_size() -> usize {
    4096
}

fn default_supported_types() -> Vec<String> {
    vec![
        "video/webm;codecs=\"vp8,opus\"".to_string(),
        "video/webm;codecs=vp9".to_string(),
        "video/webm".to_string(),
    ]
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            fallback: default_fallback(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reacquire: default_reacquire(),
            download_dir: default_download_dir(),
        }
    }
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            timeslice_ms: default_timeslice_ms(),
            fragment_size: default_fragment_size(),
            supported_types: default_supported_types(),
            device_latency_ms: 0,
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("vidrec").join("config.toml")
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("vidrec")
                .join("config.toml")
        } else {
            PathBuf::from("/etc/vidrec/config.toml")
        }
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|e| RecorderError::config(format!("Failed to read config file: {}", e)))?;

        let config: ConfigFile = toml::from_str(&content)?;

        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration, logging warnings but returning defaults on error
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path())
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    RecorderError::config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)?;

        std::fs::write(&path, content)
            .map_err(|e| RecorderError::config(format!("Failed to write config file: {}", e)))?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}

/// Generate a sample configuration file
pub fn sample_config() -> String {
    r#"# vidrec configuration

[encoding]
# Media types tried in order; the first one the capture engine supports wins
candidates = [
    'video/webm;codecs="vp8,opus"',
    "video/webm;codecs=h264",
    "video/webm;codecs=vp9",
    "video/webm",
    "video/mp4",
]

# Used when the capture engine cannot be asked what it supports ("" = none)
fallback = "video/webm"

[session]
# How starting a recording orders device reacquisition and engine binding:
#   "sequenced"  - wait for fresh devices, then record them (default)
#   "concurrent" - record the devices held right now while fresh ones are
#                  acquired in the background
reacquire = "sequenced"

# Where `save` writes recordings
download_dir = "."

[synthetic]
# Fragment interval in milliseconds
timeslice_ms = 250

# Bytes per fragment
fragment_size = 4096

# Media types the synthetic engine can record
supported_types = [
    'video/webm;codecs="vp8,opus"',
    "video/webm;codecs=vp9",
    "video/webm",
]

# Simulated latency for each device request in milliseconds
device_latency_ms = 0
"#
    .to_string()
}
