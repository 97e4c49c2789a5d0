// src/metrics.rs
use std::io::Write;
use std::path::{Path, PathBuf};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::output::write_atomic;

/// Prometheus recorder whose rendering is dumped to a node-exporter textfile
/// after each run instead of being served.
pub struct Metrics {
    pub handle: PrometheusHandle,
    textfile: PathBuf,
}

impl Metrics {
    /// Install the global recorder. `None` if one is already installed.
    pub fn init(textfile: &Path) -> Option<Self> {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                crate::ingest::ensure_metrics_described();
                Some(Self {
                    handle,
                    textfile: textfile.to_path_buf(),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "metrics recorder not installed");
                None
            }
        }
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the current exposition. Failures are logged, never returned.
    pub fn flush(&self) {
        let body = self.render();
        match write_atomic(&self.textfile, |w| w.write_all(body.as_bytes())) {
            Ok(()) => tracing::debug!(path = %self.textfile.display(), "metrics textfile written"),
            Err(e) => tracing::warn!(error = %e, "metrics textfile not written"),
        }
    }
}
