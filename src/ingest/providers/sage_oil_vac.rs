// src/ingest/providers/sage_oil_vac.rs
//! Sage Oil Vac on isolvedhire: a Next.js page whose `__NEXT_DATA__` script
//! carries the positions as JSON. The plain fetch is tried first; behind
//! Cloudflare the page only has the payload after a real browser ran it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;

use super::sel;
use crate::error::ScrapeError;
use crate::ingest::browser::{run_blocking, BrowserSession, BrowserSettings, Deadline};
use crate::ingest::http::Fetch;
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "sage-oil-vac";
pub const COMPANY: &str = "Sage Oil Vac";
pub const LIST_URL: &str = "https://sageoilvac.isolvedhire.com/jobs/";
const NEXT_DATA: &str = "script#__NEXT_DATA__";

pub struct SageOilVacSource {
    fetcher: Arc<dyn Fetch>,
    /// `None` disables the browser fallback.
    browser: Option<BrowserSettings>,
}

impl SageOilVacSource {
    pub fn new(fetcher: Arc<dyn Fetch>, browser: Option<BrowserSettings>) -> Self {
        Self { fetcher, browser }
    }
}

/// Position objects inside a `__NEXT_DATA__` payload: `props.pageProps.positions`
/// (or `.data.positions`), else the first array of objects that have a `title`.
pub fn extract_positions(data: &Value) -> Vec<Value> {
    let page_props = data.pointer("/props/pageProps");
    let direct = page_props
        .and_then(|p| p.get("positions"))
        .or_else(|| page_props.and_then(|p| p.pointer("/data/positions")));
    if let Some(Value::Array(items)) = direct {
        if !items.is_empty() {
            return items.clone();
        }
    }
    find_title_array(data).cloned().unwrap_or_default()
}

fn find_title_array(v: &Value) -> Option<&Vec<Value>> {
    match v {
        Value::Array(items) => {
            if items.first().and_then(|f| f.get("title")).is_some() {
                return Some(items);
            }
            items.iter().find_map(find_title_array)
        }
        Value::Object(map) => map.values().find_map(find_title_array),
        _ => None,
    }
}

/// One position object is already provider-shaped; only the `location`
/// country suffix is stripped. A position without a link keeps a null `url`.
fn to_raw(position: Value) -> Option<RawPosting> {
    let mut raw = RawPosting::from_json(position)?;
    if let Some(loc) = raw.get_str("location").map(|l| l.replace(", USA", "").trim().to_string()) {
        raw.set("location", loc);
    }
    Some(raw)
}

/// `None` when the page has no usable `__NEXT_DATA__` script.
pub fn parse_next_data(html: &str) -> Result<Option<Vec<RawPosting>>, ScrapeError> {
    let doc = Html::parse_document(html);
    let script_sel = sel(NEXT_DATA, LIST_URL)?;
    let Some(script) = doc.select(&script_sel).next() else {
        return Ok(None);
    };
    let body: String = script.text().collect();
    let Ok(data) = serde_json::from_str::<Value>(&body) else {
        return Ok(None);
    };
    let rows: Vec<RawPosting> = extract_positions(&data)
        .into_iter()
        .filter_map(to_raw)
        .collect();
    Ok(Some(rows))
}

fn render_with_browser(cfg: &BrowserSettings, deadline: Deadline) -> Result<String, ScrapeError> {
    let session = BrowserSession::launch(CODE, &cfg.user_agent, deadline)?;
    session.goto(LIST_URL)?;
    session.wait_for(NEXT_DATA, cfg.budget.min(Duration::from_secs(120)))?;
    session.content()
}

#[async_trait]
impl JobSource for SageOilVacSource {
    fn code(&self) -> &'static str {
        CODE
    }

    fn company(&self) -> &'static str {
        COMPANY
    }

    fn class(&self) -> VendorClass {
        VendorClass::StructuredData
    }

    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
        let plain = match self.fetcher.get_text(LIST_URL, None).await {
            Ok(body) => parse_next_data(&body)?,
            Err(e) => {
                tracing::debug!(source = CODE, error = %e, "plain fetch failed");
                None
            }
        };
        if let Some(rows) = plain.filter(|r| !r.is_empty()) {
            return Ok(rows);
        }

        let Some(cfg) = self.browser.clone() else {
            return Err(ScrapeError::selector(
                LIST_URL,
                NEXT_DATA,
                "no position data in plain HTML and browser fallback is disabled",
            ));
        };
        tracing::info!(source = CODE, "falling back to headless browser");
        let budget = cfg.budget;
        let html = run_blocking(budget, move |deadline| render_with_browser(&cfg, deadline)).await?;
        match parse_next_data(&html)? {
            Some(rows) => Ok(rows),
            None => Err(ScrapeError::selector(
                LIST_URL,
                NEXT_DATA,
                "rendered page has no position data",
            )),
        }
    }
}
