// src/ingest/mod.rs
pub mod browser;
pub mod http;
pub mod normalize;
pub mod pagination;
pub mod providers;
pub mod sources;
pub mod text;
pub mod types;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::error::{ScrapeError, WriteError};
use crate::ingest::normalize::{derive_id, normalize_batch, now_utc_seconds};
use crate::ingest::types::{JobSource, Posting, RawPosting};

/// One-time metrics registration (so series show up in the exposition).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "scrape_postings_total",
            "Postings kept after normalization, per source."
        );
        describe_counter!(
            "scrape_adapter_errors_total",
            "Adapter runs that failed (fetch, timeout, selector)."
        );
        describe_counter!(
            "normalize_dropped_total",
            "Raw records dropped as unmappable."
        );
        describe_counter!(
            "dedup_removed_total",
            "Postings removed by global deduplication."
        );
        describe_histogram!("scrape_fetch_ms", "Adapter fetch time in milliseconds.");
        describe_gauge!("scrape_last_run_ts", "Unix ts when the aggregator last ran.");
    });
}

/// Where the runner is; logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching(&'static str),
    Normalizing,
    Merged,
    Written,
}

fn enter(phase: RunPhase) {
    tracing::debug!(?phase, "run phase");
}

/// How one adapter fared in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source: &'static str,
    pub kept: usize,
    pub dropped: usize,
    /// Rendered error when the adapter failed and contributed nothing.
    pub error: Option<String>,
}

impl SourceOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Per-adapter budget.
    pub timeout: Duration,
    pub parallel: bool,
}

impl RunOptions {
    pub fn from_config(cfg: &crate::config::AggregatorConfig) -> Self {
        Self {
            timeout: Duration::from_secs(cfg.timeout_secs),
            parallel: cfg.parallel,
        }
    }
}

/// Merged result of one run, passed on to the writer.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub postings: Vec<Posting>,
    pub outcomes: Vec<SourceOutcome>,
    pub dedup_removed: usize,
}

impl RunReport {
    pub fn failed_sources(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|o| o.failed())
            .map(|o| o.source)
            .collect()
    }
}

/// Group key: the posting id, else the content hash it would have been given.
fn dedup_key(p: &Posting) -> String {
    match &p.id {
        Some(id) => id.clone(),
        None => derive_id(
            p.title.as_deref().unwrap_or_default(),
            p.company.as_deref().unwrap_or_default(),
            p.location.as_deref(),
        ),
    }
}

/// Collapse postings sharing a key. The representative is the richest record
/// (most of location/salary/url set), then the earliest `scraped_at`, then the
/// first seen; it carries the earliest `scraped_at` of its group. Output keeps
/// first-appearance order. Returns the kept postings and how many were removed.
pub fn dedup(postings: Vec<Posting>) -> (Vec<Posting>, usize) {
    let total = postings.len();
    let mut slot_of: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Posting> = Vec::with_capacity(total);

    for p in postings {
        let key = dedup_key(&p);
        let Some(slot) = slot_of.get(&key).copied() else {
            slot_of.insert(key, kept.len());
            kept.push(p);
            continue;
        };
        let current = &mut kept[slot];
        let earliest = current.scraped_at.min(p.scraped_at);
        let better = p.richness() > current.richness()
            || (p.richness() == current.richness() && p.scraped_at < current.scraped_at);
        if better {
            *current = p;
        }
        current.scraped_at = earliest;
    }

    let removed = total - kept.len();
    (kept, removed)
}

/// Fetch one adapter under its budget. Failures are logged and counted, never
/// propagated.
pub async fn collect_source(
    source: &dyn JobSource,
    timeout: Duration,
) -> Result<(Vec<RawPosting>, chrono::NaiveDateTime), ScrapeError> {
    let code = source.code();
    enter(RunPhase::Fetching(code));
    let started = Instant::now();
    let res = match tokio::time::timeout(timeout, source.fetch()).await {
        Ok(r) => r,
        Err(_) => Err(ScrapeError::Timeout {
            secs: timeout.as_secs(),
        }),
    };
    let elapsed_ms = started.elapsed().as_millis() as f64;
    histogram!("scrape_fetch_ms", "source" => code).record(elapsed_ms);

    match res {
        Ok(raws) => {
            tracing::info!(source = code, count = raws.len(), ms = elapsed_ms, "adapter finished");
            Ok((raws, now_utc_seconds()))
        }
        Err(e) => {
            match &e {
                ScrapeError::Fetch { url, stage, .. } => {
                    tracing::warn!(source = code, %url, stage = *stage, error = %e, "adapter failed")
                }
                ScrapeError::Selector { url, selector, .. } => {
                    tracing::warn!(source = code, %url, stage = "select", %selector, error = %e, "adapter failed")
                }
                ScrapeError::Timeout { .. } => {
                    tracing::warn!(source = code, stage = "timeout", error = %e, "adapter failed")
                }
            }
            counter!("scrape_adapter_errors_total", "source" => code, "kind" => e.kind())
                .increment(1);
            Err(e)
        }
    }
}

fn normalize_outcome(
    source: &dyn JobSource,
    fetched: Result<(Vec<RawPosting>, chrono::NaiveDateTime), ScrapeError>,
    into: &mut Vec<Posting>,
) -> SourceOutcome {
    let code = source.code();
    match fetched {
        Ok((raws, fetched_at)) => {
            enter(RunPhase::Normalizing);
            let (postings, dropped) = normalize_batch(raws, &source.meta(), fetched_at);
            counter!("scrape_postings_total", "source" => code).increment(postings.len() as u64);
            let kept = postings.len();
            into.extend(postings);
            SourceOutcome {
                source: code,
                kept,
                dropped,
                error: None,
            }
        }
        Err(e) => SourceOutcome {
            source: code,
            kept: 0,
            dropped: 0,
            error: Some(e.to_string()),
        },
    }
}

/// Run every adapter once, normalize and merge. Adapter order is kept in the
/// output whether or not the adapters ran concurrently.
pub async fn run_once(sources: &[Arc<dyn JobSource>], opts: &RunOptions) -> RunReport {
    ensure_metrics_described();
    enter(RunPhase::Idle);

    let fetched: Vec<_> = if opts.parallel {
        let mut set = JoinSet::new();
        for (idx, source) in sources.iter().enumerate() {
            let source = Arc::clone(source);
            let timeout = opts.timeout;
            set.spawn(async move { (idx, collect_source(source.as_ref(), timeout).await) });
        }
        let mut slots: Vec<Option<_>> = (0..sources.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, res)) => slots[idx] = Some(res),
                Err(e) => tracing::error!(error = %e, "adapter task panicked"),
            }
        }
        slots
            .into_iter()
            .map(|s| {
                s.unwrap_or_else(|| Err(ScrapeError::fetch("task://adapter", "join", "task aborted")))
            })
            .collect()
    } else {
        let mut out = Vec::with_capacity(sources.len());
        for source in sources {
            out.push(collect_source(source.as_ref(), opts.timeout).await);
        }
        out
    };

    let mut merged = Vec::new();
    let outcomes: Vec<SourceOutcome> = sources
        .iter()
        .zip(fetched)
        .map(|(source, res)| normalize_outcome(source.as_ref(), res, &mut merged))
        .collect();

    let (postings, dedup_removed) = dedup(merged);
    enter(RunPhase::Merged);
    counter!("dedup_removed_total").increment(dedup_removed as u64);
    gauge!("scrape_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    let report = RunReport {
        postings,
        outcomes,
        dedup_removed,
    };
    tracing::info!(
        postings = report.postings.len(),
        dedup_removed,
        failed = ?report.failed_sources(),
        "run merged"
    );
    report
}

/// `run_once` followed by the atomic artifact write. Only the write can fail.
pub async fn run_and_write(
    sources: &[Arc<dyn JobSource>],
    opts: &RunOptions,
    output: &Path,
) -> Result<RunReport, WriteError> {
    let report = run_once(sources, opts).await;
    crate::output::write_snapshot(output, &report.postings)?;
    enter(RunPhase::Written);
    tracing::info!(path = %output.display(), count = report.postings.len(), "artifact written");
    enter(RunPhase::Idle);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn posting(id: &str, url: Option<&str>, sec: u32) -> Posting {
        Posting {
            id: Some(id.into()),
            title: Some("Welder".into()),
            company: Some("Acme".into()),
            location: Some("Amarillo, TX".into()),
            salary: None,
            url: url.map(str::to_string),
            scraped_at: NaiveDate::from_ymd_opt(2025, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, sec)
                .unwrap(),
            source: "yhmc".into(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn dedup_prefers_richer_record_and_keeps_earliest_time() {
        let (out, removed) = dedup(vec![
            posting("a", None, 5),
            posting("b", None, 0),
            posting("a", Some("https://x/1"), 9),
        ]);
        assert_eq!(removed, 1);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id.as_deref(), Some("a"));
        assert_eq!(out[0].url.as_deref(), Some("https://x/1"));
        assert_eq!(out[0].scraped_at.format("%S").to_string(), "05");
        assert_eq!(out[1].id.as_deref(), Some("b"));
    }

    #[test]
    fn dedup_tie_goes_to_earliest() {
        let (out, _) = dedup(vec![
            posting("a", Some("https://x/late"), 30),
            posting("a", Some("https://x/early"), 10),
        ]);
        assert_eq!(out[0].url.as_deref(), Some("https://x/early"));
    }

    #[test]
    fn missing_id_groups_by_content_hash() {
        let mut a = posting("x", None, 1);
        a.id = None;
        let mut b = a.clone();
        b.url = Some("https://x/2".into());
        let (out, removed) = dedup(vec![a, b]);
        assert_eq!(removed, 1);
        assert_eq!(out[0].url.as_deref(), Some("https://x/2"));
    }
}
