// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod snapshot;

// ---- Re-exports for stable public API ----
pub use crate::config::AggregatorConfig;
pub use crate::error::{NormalizationError, ScrapeError, WriteError};
pub use crate::ingest::sources::{SourceContext, SourceId};
pub use crate::ingest::types::{JobSource, Posting, RawPosting, SourceMeta, VendorClass};
pub use crate::ingest::{dedup, run_and_write, run_once, RunOptions, RunReport};

use std::sync::Arc;

use crate::ingest::http::{Fetch, HttpFetcher};

/// Adapters enabled by `cfg`, sharing one HTTP client.
pub fn sources_from_config(cfg: &AggregatorConfig) -> anyhow::Result<Vec<Arc<dyn JobSource>>> {
    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(&cfg.http)?);
    let ctx = SourceContext::from_config(cfg, fetcher);
    let ids = SourceId::from_config(cfg);
    Ok(ingest::sources::build_all(&ids, &ctx))
}
