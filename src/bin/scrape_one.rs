//! Run a single partner adapter and print its result set as JSON.
//!
//! ```text
//! scrape_one <source-code> [--raw]
//! scrape_one --list
//! ```
//! Never touches the artifact.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use horizons_jobs::config::AggregatorConfig;
use horizons_jobs::ingest::http::{Fetch, HttpFetcher};
use horizons_jobs::ingest::normalize::{normalize_batch, now_utc_seconds};
use horizons_jobs::ingest::sources::{build, SourceContext, SourceId};
use horizons_jobs::logging::init_tracing;

const USAGE: &str = "usage: scrape_one <source-code> [--raw] | scrape_one --list";

struct Args {
    source: SourceId,
    raw: bool,
}

fn parse_args(args: &[String]) -> Result<Option<Args>> {
    if args.iter().any(|a| a == "--list") {
        return Ok(None);
    }
    let raw = args.iter().any(|a| a == "--raw");
    let Some(code) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("{USAGE}");
    };
    let source = code.parse::<SourceId>()?;
    Ok(Some(Args { source, raw }))
}

async fn run(args: Args) -> Result<()> {
    let mut cfg = AggregatorConfig::load_default().unwrap_or_default();
    // the user asked for this one explicitly
    cfg.browser = true;

    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(&cfg.http)?);
    let ctx = SourceContext::from_config(&cfg, fetcher);
    let source = build(args.source, &ctx);

    let budget = Duration::from_secs(cfg.timeout_secs);
    let raws = tokio::time::timeout(budget, source.fetch())
        .await
        .with_context(|| format!("{} timed out after {}s", args.source, budget.as_secs()))??;
    let fetched_at = now_utc_seconds();

    let body = if args.raw {
        serde_json::to_string_pretty(&raws)?
    } else {
        let (postings, dropped) = normalize_batch(raws, &source.meta(), fetched_at);
        tracing::info!(source = source.code(), kept = postings.len(), dropped, "normalized");
        serde_json::to_string_pretty(&postings)?
    };
    println!("{body}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(Some(a)) => a,
        Ok(None) => {
            for id in SourceId::ALL {
                println!("{:<18} {}", id.code(), id.class().as_str());
            }
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "adapter run failed");
            ExitCode::FAILURE
        }
    }
}
