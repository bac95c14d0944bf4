//! Interactive command - drive a session from stdin
//!
//! Reads one command per line and renders session events as they arrive,
//! the way a preview/playback shell would.

use anyhow::{Context as _, Result};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::debug;
use vidrec_core::RecordingStatus;
use vidrec_core::error::RecorderError;
use vidrec_core::event::SessionEvent;
use vidrec_core::session::RecordingSession;

use super::Context;
use super::record::report_error;

const HELP: &str = "\
Commands:
  grant        Ask for camera and microphone access
  start        Start recording
  stop         Stop recording and show the result
  reset        Discard the result and return to the live preview
  save [PATH]  Save the result
  status       Show session status
  json         Show session status as JSON
  help         Show this help
  quit         Exit";

/// Run the interactive shell
pub async fn interactive(ctx: &Context) -> Result<()> {
    let mut session = ctx.session()?;
    let events = tokio::spawn(render_events(session.subscribe()));

    println!("vidrec - Interactive Session\n");
    println!("{}\n", HELP);

    if let Err(e) = session.mount().await {
        debug!("Initial acquisition failed: {}", e);
    }
    show_controls(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };

        match command {
            "grant" => {
                // Failures arrive as error events
                let _ = session.request_permissions().await;
                if session.permission_granted() && !session.has_live_stream() {
                    let _ = session.reset().await;
                }
            }
            "start" => {
                if let Err(e) = session.start().await {
                    if matches!(e, RecorderError::SessionAlreadyRunning) {
                        report_error(&e);
                    }
                }
            }
            "stop" => match session.stop().await {
                Ok(Some(_)) => {}
                Ok(None) => report_error(&RecorderError::NoActiveSession),
                Err(e) => report_error(&e),
            },
            "reset" => {
                let _ = session.reset().await;
            }
            "save" => {
                let path = words.next().map(PathBuf::from);
                match session.save_artifact(path) {
                    Ok(path) => println!("Saved to {}", path.display()),
                    Err(e) => report_error(&e),
                }
            }
            "status" => println!("{}", session.stats()),
            "json" => println!("{}", serde_json::to_string_pretty(&session.stats())?),
            "help" | "?" => println!("{}", HELP),
            "quit" | "exit" | "q" => break,
            other => println!("Unknown command '{}'. Type `help`.", other),
        }

        // Let the event renderer catch up before prompting again
        tokio::task::yield_now().await;
        show_controls(&session);
    }

    if session.is_recording() {
        println!("Stopping recording...");
        if let Err(e) = session.stop().await {
            report_error(&e);
        }
    }

    drop(session);
    events.abort();
    Ok(())
}

/// Print the controls the current state allows
fn show_controls(session: &RecordingSession) {
    let mut controls = Vec::new();
    if !session.permission_granted() {
        controls.push("grant");
    }
    match session.status() {
        RecordingStatus::Inactive => controls.push("start"),
        RecordingStatus::Started => controls.push("stop"),
    }
    if session.artifact().is_some() {
        controls.push("save");
        controls.push("reset");
    }
    println!("[{}] > {}", session.status(), controls.join(" | "));
}

async fn render_events(mut rx: broadcast::Receiver<SessionEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => render(&event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                debug!("Event renderer skipped {} events", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn render(event: &SessionEvent) {
    match event {
        SessionEvent::StatusChanged { status } => println!("  status: {}", status),
        SessionEvent::PermissionChanged { granted } => {
            println!("  permission: {}", if *granted { "granted" } else { "denied" })
        }
        SessionEvent::StreamAcquired {
            stream_id,
            preview_tracks,
        } => println!(
            "  preview: stream {} ({} video track{})",
            stream_id,
            preview_tracks,
            if *preview_tracks == 1 { "" } else { "s" }
        ),
        SessionEvent::ArtifactReady { artifact } => println!(
            "  playback: {} ({}, {} bytes, {} fragments)",
            artifact.url, artifact.mime_type, artifact.size, artifact.chunk_count
        ),
        SessionEvent::ArtifactCleared => println!("  playback cleared"),
        SessionEvent::Error { message, .. } => eprintln!("  error: {}", message),
    }
}
