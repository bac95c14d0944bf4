//! Shared setup: config loading and the synthetic runtime knobs

use anyhow::{Context as _, Result};
use clap::Args;
use std::path::PathBuf;
use vidrec_core::config::{ConfigFile, SessionConfig};
use vidrec_core::encoding::MimeType;
use vidrec_core::runtime::{SyntheticOptions, SyntheticRuntime};
use vidrec_core::session::RecordingSession;

/// Switches for the synthetic device runtime
#[derive(Args, Debug, Clone, Default)]
pub struct RuntimeArgs {
    /// Refuse every device request as if permission was denied
    #[arg(long, global = true)]
    pub deny_permission: bool,

    /// Pretend the runtime has no capture API
    #[arg(long, global = true)]
    pub no_capture_api: bool,

    /// Pretend the capture API cannot be asked which types it supports
    #[arg(long, global = true)]
    pub no_type_query: bool,

    /// Fail camera requests as if the camera were in use
    #[arg(long, global = true)]
    pub busy_camera: bool,

    /// Media types the engine supports (repeatable; overrides the config)
    #[arg(long = "supported", value_name = "MIME", global = true)]
    pub supported: Vec<String>,
}

/// Everything a command needs to build a session
pub struct Context {
    config_path: Option<PathBuf>,
    runtime: RuntimeArgs,
}

impl Context {
    pub fn new(config_path: Option<PathBuf>, runtime: RuntimeArgs) -> Self {
        Self {
            config_path,
            runtime,
        }
    }

    /// Config file path in effect
    pub fn config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(ConfigFile::default_path)
    }

    /// Load the config file. An explicit `--config` must parse; the default
    /// location falls back to defaults on error.
    pub fn load_config(&self) -> Result<ConfigFile> {
        match &self.config_path {
            Some(path) => ConfigFile::load_from(path.clone())
                .with_context(|| format!("Failed to load config from {}", path.display())),
            None => Ok(ConfigFile::load_or_default()),
        }
    }

    /// Synthetic runtime with config settings and command-line overrides
    pub fn synthetic_runtime(&self, file: &ConfigFile) -> SyntheticRuntime {
        let mut options = SyntheticOptions::from_settings(&file.synthetic);
        options.deny_permission = self.runtime.deny_permission;
        options.capture_available = !self.runtime.no_capture_api;
        options.type_query = !self.runtime.no_type_query;
        options.camera_busy = self.runtime.busy_camera;
        if !self.runtime.supported.is_empty() {
            options.supported_types = self
                .runtime
                .supported
                .iter()
                .map(|t| MimeType::new(t.as_str()))
                .collect();
        }
        SyntheticRuntime::new(options)
    }

    /// Build a session over the synthetic runtime
    pub fn session(&self) -> Result<RecordingSession> {
        let file = self.load_config()?;
        let config = SessionConfig::from_file(&file);
        let runtime = self.synthetic_runtime(&file).into_runtime();
        RecordingSession::new(runtime, config).context("Failed to create recording session")
    }
}
