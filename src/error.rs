// src/error.rs
//! Error taxonomy for one aggregation run.
//!
//! Adapter and normalizer errors are recoverable (the run keeps going with
//! less data); only [`WriteError`] is fatal.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failure of one vendor adapter. Always degrades that adapter's
/// contribution to zero postings for the run.
#[derive(Debug)]
pub enum ScrapeError {
    /// Network, HTTP status, browser launch or body decoding failure.
    Fetch {
        url: String,
        stage: &'static str,
        reason: String,
    },
    /// The per-adapter time budget ran out.
    Timeout { secs: u64 },
    /// The page no longer has the structure the adapter expects.
    Selector {
        url: String,
        selector: String,
        detail: String,
    },
}

impl ScrapeError {
    pub fn fetch(url: impl Into<String>, stage: &'static str, reason: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            stage,
            reason: reason.to_string(),
        }
    }

    pub fn selector(
        url: impl Into<String>,
        selector: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Selector {
            url: url.into(),
            selector: selector.into(),
            detail: detail.into(),
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Timeout { .. } => "timeout",
            Self::Selector { .. } => "selector",
        }
    }
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { url, stage, reason } => {
                write!(f, "fetch failed at {stage} ({url}): {reason}")
            }
            Self::Timeout { secs } => write!(f, "adapter timed out after {secs}s"),
            Self::Selector {
                url,
                selector,
                detail,
            } => write!(f, "expected `{selector}` on {url}: {detail}"),
        }
    }
}

impl std::error::Error for ScrapeError {}

/// A raw record that cannot be mapped onto a posting. The record is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    MissingTitle,
    Unmappable { field: &'static str },
}

impl fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTitle => f.write_str("record has no usable title"),
            Self::Unmappable { field } => {
                write!(f, "field `{field}` holds a value that is not a scalar")
            }
        }
    }
}

impl std::error::Error for NormalizationError {}

/// The artifact could not be persisted. Fatal to the run; the previous
/// artifact is left untouched.
#[derive(Debug)]
pub struct WriteError {
    pub path: PathBuf,
    pub stage: &'static str,
    pub source: io::Error,
}

impl WriteError {
    pub fn new(path: impl Into<PathBuf>, stage: &'static str, source: io::Error) -> Self {
        Self {
            path: path.into(),
            stage,
            source,
        }
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "writing {} failed at {}: {}",
            self.path.display(),
            self.stage,
            self.source
        )
    }
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
