//! vidrec CLI
//!
//! Record audio and video from local devices.
//!
//! # Usage
//!
//! ```bash
//! # Record five seconds and save it
//! vidrec record --duration 5 --output take.webm
//!
//! # Drive a session by hand: grant, start, stop, save, reset
//! vidrec interactive
//!
//! # Show which encodings would be negotiated
//! vidrec formats
//! ```

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// vidrec - record audio/video from local devices
#[derive(Parser)]
#[command(name = "vidrec")]
#[command(version)]
#[command(about = "Record audio and video from local devices", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use this config file instead of ~/.config/vidrec/config.toml
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    runtime: commands::RuntimeArgs,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record for a fixed duration and save the result
    #[command(alias = "rec")]
    Record(commands::RecordArgs),

    /// Drive a recording session from stdin
    #[command(alias = "i")]
    Interactive,

    /// Show encoding candidates and which one would be used
    Formats(commands::FormatsArgs),

    /// Manage configuration files
    Config(commands::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let directive = format!("vidrec={}", level)
        .parse::<Directive>()
        .context("Invalid log directive")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .with_target(false)
        .init();

    let ctx = commands::Context::new(cli.config, cli.runtime);

    match cli.command {
        Commands::Record(args) => commands::record(&ctx, args).await?,
        Commands::Interactive => commands::interactive(&ctx).await?,
        Commands::Formats(args) => commands::formats(&ctx, args)?,
        Commands::Config(args) => commands::config(&ctx, args)?,
    }

    Ok(())
}
