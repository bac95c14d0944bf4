//! Formats command - show encoding negotiation against the runtime

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use vidrec_core::capture::CaptureBackend;
use vidrec_core::config::SessionConfig;

use super::Context;

/// Arguments for the formats command
#[derive(Args)]
pub struct FormatsArgs {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Candidate {
    mime_type: String,
    supported: Option<bool>,
}

#[derive(Serialize)]
struct FormatsReport {
    capture_available: bool,
    type_query: bool,
    candidates: Vec<Candidate>,
    fallback: Option<String>,
    selected: String,
}

/// Show the candidate table and the negotiated encoding
pub fn formats(ctx: &Context, args: FormatsArgs) -> Result<()> {
    let file = ctx.load_config()?;
    let config = SessionConfig::from_file(&file);
    let backend = ctx.synthetic_runtime(&file);
    let negotiator = config.negotiator();

    let type_query = backend.supports_type_query();
    let report = FormatsReport {
        capture_available: backend.is_available(),
        type_query,
        candidates: negotiator
            .candidates()
            .iter()
            .map(|mime| Candidate {
                mime_type: mime.as_str().to_string(),
                supported: type_query.then(|| backend.is_type_supported(mime)),
            })
            .collect(),
        fallback: negotiator.fallback().map(|f| f.as_str().to_string()),
        selected: negotiator.select_encoding(&backend).as_str().to_string(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("vidrec - Encoding Candidates\n");
    println!("  Capture API:  {}", yes_no(report.capture_available));
    println!("  Type query:   {}", yes_no(report.type_query));
    println!();

    for (index, candidate) in report.candidates.iter().enumerate() {
        let status = match candidate.supported {
            Some(true) => "supported",
            Some(false) => "-",
            None => "unknown",
        };
        println!("  {}. {:<32} {}", index + 1, candidate.mime_type, status);
    }
    if report.candidates.is_empty() {
        println!("  (no candidates configured)");
    }

    println!();
    println!(
        "  Fallback:     {}",
        report.fallback.as_deref().unwrap_or("(none)")
    );
    if report.selected.is_empty() {
        println!("  Selected:     (engine default)");
    } else {
        println!("  Selected:     {}", report.selected);
    }

    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
