//! Record command - capture for a fixed duration and save

use anyhow::{Context as _, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use vidrec_core::error::RecorderError;

use super::Context;

/// Arguments for the record command
#[derive(Args)]
pub struct RecordArgs {
    /// Recording length in seconds
    #[arg(short, long, default_value = "5")]
    duration: f64,

    /// Where to save the recording (default: download dir / recording.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the artifact as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

/// Record one take
pub async fn record(ctx: &Context, args: RecordArgs) -> Result<()> {
    if !args.duration.is_finite() || args.duration <= 0.0 {
        anyhow::bail!("Duration must be a positive number of seconds");
    }
    let duration = Duration::from_secs_f64(args.duration);

    let mut session = ctx.session()?;

    // Acquisition failures are reported and recording is still attempted
    if let Err(e) = session.mount().await {
        report_error(&e);
    }

    session.start().await.context("Failed to start recording")?;
    if !args.json {
        println!(
            "Recording for {:.1}s (Ctrl+C to stop early)...",
            duration.as_secs_f64()
        );
    }

    tokio::select! {
        _ = tokio::time::sleep(duration) => {
            info!("Recording duration reached");
        }
        result = signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            if !args.json {
                println!("\nReceived interrupt signal...");
            }
        }
    }

    let artifact = session
        .stop()
        .await?
        .ok_or(RecorderError::NoActiveSession)
        .context("Recording ended without a capture engine")?;
    let path = session
        .save_artifact(args.output)
        .context("Failed to save recording")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
        return Ok(());
    }

    println!("Recording saved.");
    println!("  File:      {}", path.display());
    println!("  Type:      {}", artifact.mime_type);
    println!("  Size:      {} bytes", artifact.size);
    println!("  Fragments: {}", artifact.chunk_count);
    println!("  Duration:  {:.2}s", artifact.duration.as_secs_f64());

    Ok(())
}

/// Print a session error with its hint
pub(super) fn report_error(err: &RecorderError) {
    eprintln!("Error: {}", err.user_message());
    if let Some(hint) = err.user_hint() {
        eprintln!("  {}", hint);
    }
}
