//! Aggregator entrypoint: run every enabled partner adapter once, merge, and
//! replace the artifact. Meant for a daily scheduler; takes no arguments.
//!
//! Exit code is non-zero only when the artifact could not be written.

use std::process::ExitCode;

use horizons_jobs::config::AggregatorConfig;
use horizons_jobs::ingest::{run_and_write, RunOptions};
use horizons_jobs::logging::init_tracing;
use horizons_jobs::metrics::Metrics;

fn load_config() -> AggregatorConfig {
    match AggregatorConfig::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = ?e, "config unusable, running with defaults");
            let mut cfg = AggregatorConfig::default();
            cfg.apply_env();
            cfg
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config();
    let metrics = cfg.metrics_textfile.as_deref().and_then(Metrics::init);

    let sources = match horizons_jobs::sources_from_config(&cfg) {
        Ok(s) => s,
        Err(e) => {
            // no HTTP client means no adapter can run; still publish an empty snapshot
            tracing::error!(error = ?e, "could not build adapters");
            Vec::new()
        }
    };
    tracing::info!(
        sources = sources.len(),
        parallel = cfg.parallel,
        output = %cfg.output_path.display(),
        "aggregator run starting"
    );

    let opts = RunOptions::from_config(&cfg);
    let result = run_and_write(&sources, &opts, &cfg.output_path).await;

    if let Some(m) = &metrics {
        m.flush();
    }

    match result {
        Ok(report) => {
            tracing::info!(
                postings = report.postings.len(),
                failed = report.failed_sources().len(),
                "aggregator run done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "artifact not written");
            ExitCode::FAILURE
        }
    }
}
