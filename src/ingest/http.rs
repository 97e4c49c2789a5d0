// src/ingest/http.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::Client;

use crate::config::HttpConfig;
use crate::error::ScrapeError;

/// Plain GET of an HTML/JSON page. Seam between adapters and the network so
/// parsers can be driven from fixtures.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get_text(&self, url: &str, referer: Option<&str>) -> Result<String, ScrapeError>;
}

pub struct HttpFetcher {
    client: Client,
    retries: u8,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(cfg: &HttpConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            retries: cfg.retries,
            retry_delay: Duration::from_millis(cfg.retry_delay_ms),
        })
    }

    async fn get_once(&self, url: &str, referer: Option<&str>) -> Result<String, ScrapeError> {
        let mut req = self.client.get(url);
        if let Some(r) = referer {
            req = req.header(REFERER, r);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| ScrapeError::fetch(url, "send", e))?
            .error_for_status()
            .map_err(|e| ScrapeError::fetch(url, "status", e))?;
        resp.text()
            .await
            .map_err(|e| ScrapeError::fetch(url, "body", e))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get_text(&self, url: &str, referer: Option<&str>) -> Result<String, ScrapeError> {
        let mut attempt = 0u8;
        loop {
            match self.get_once(url, referer).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!(%url, attempt, error = %e, "retrying GET");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Serves canned bodies by URL and counts calls. Unknown URLs fail like a 404.
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for FixtureFetcher {
    async fn get_text(&self, url: &str, _referer: Option<&str>) -> Result<String, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::fetch(url, "status", "404 Not Found (fixture)"))
    }
}

/// Short random pause between per-job detail requests.
pub async fn polite_pause(enabled: bool) {
    if !enabled {
        return;
    }
    let delays = [500u64, 900, 1200, 1500];
    let ms = *delays.choose(&mut rand::rng()).unwrap_or(&900);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
