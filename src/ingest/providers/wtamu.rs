// src/ingest/providers/wtamu.rs
//! West Texas A&M on Workday. Listing pages are `?page=N` under one of two
//! start URLs (with and without the locale prefix); the first start URL that
//! yields anything wins.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::Html;

use super::{closest, dedup_by_id_url, first_text, sel};
use crate::error::ScrapeError;
use crate::ingest::browser::{run_blocking, BrowserSession, BrowserSettings, Deadline};
use crate::ingest::pagination::{Page, Pagination};
use crate::ingest::text::clean_text;
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "wtamu";
pub const COMPANY: &str = "West Texas A&M University";
pub const BASE: &str = "https://tamus.wd1.myworkdayjobs.com";
pub const SITE: &str = "WTAMU_External";
const JOB_TITLE: &str = r#"a[data-automation-id="jobTitle"]"#;

pub fn start_urls() -> [String; 2] {
    [format!("{BASE}/en-US/{SITE}"), format!("{BASE}/{SITE}")]
}

pub fn page_url(start: &str, page: usize) -> String {
    if page <= 1 {
        start.to_string()
    } else {
        format!("{start}?page={page}")
    }
}

fn re_req_id() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\b(R-\d+(?:-\d+)?)\b").expect("static regex"))
}

fn re_location_prefix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)^locations?\s*").expect("static regex"))
}

pub fn extract_req_id(text: &str) -> Option<String> {
    re_req_id()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Workday prefixes the location with a hidden "Locations" label.
pub fn clean_location(raw: Option<&str>) -> Option<String> {
    let t = clean_text(raw?);
    let t = re_location_prefix().replace(&t, "").trim().to_string();
    (!t.is_empty()).then_some(t)
}

/// Standalone job detail URL for a list link, without the query or fragment
/// that would route it into the sidebar view.
pub fn normalize_job_href(href: &str, page_url: &str) -> String {
    let h = href.trim();
    let h = h.strip_prefix("./").unwrap_or(h);
    if h.is_empty() {
        return page_url.to_string();
    }
    let full = if h.starts_with("http://") || h.starts_with("https://") {
        h.to_string()
    } else if h.starts_with("//") {
        format!("https:{h}")
    } else if h.starts_with('/') {
        format!("{BASE}{h}")
    } else if h.starts_with("job/") {
        format!("{BASE}/en-US/{SITE}/{h}")
    } else {
        format!("{BASE}/{h}")
    };
    let end = full.find(['?', '#']).unwrap_or(full.len());
    full[..end].to_string()
}

pub fn parse_listing(html: &str, page_url: &str) -> Result<Page, ScrapeError> {
    let doc = Html::parse_document(html);
    let a_sel = sel(JOB_TITLE, page_url)?;
    let loc_sel = sel(r#"[data-automation-id="locations"]"#, page_url)?;
    let sub_sel = sel(r#"ul[data-automation-id="subtitle"] li"#, page_url)?;

    let mut page = Page::default();
    for a in doc.select(&a_sel) {
        let href = a.value().attr("href").unwrap_or_default().trim();
        let url = normalize_job_href(href, page_url);
        let item = closest(a, "li");
        let location = item
            .and_then(|li| li.select(&loc_sel).next())
            .map(|el| el.text().collect::<Vec<_>>().join(" "));
        let req_id = item
            .and_then(|li| first_text(li, &sub_sel))
            .and_then(|s| extract_req_id(&s));
        let id = req_id.or_else(|| {
            href.trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        });

        page.keys.push(id.clone().unwrap_or_else(|| url.clone()));
        page.records.push(
            RawPosting::new()
                .with("id", id)
                .with("title", super::text_of(a))
                .with("location", clean_location(location.as_deref()))
                .with("url", url),
        );
    }
    Ok(page)
}

fn crawl(
    settings: &BrowserSettings,
    max_pages: usize,
    deadline: Deadline,
) -> Result<Vec<RawPosting>, ScrapeError> {
    let session = BrowserSession::launch(CODE, &settings.user_agent, deadline)?;
    let mut last_miss = None;

    for start in start_urls() {
        let mut pager = Pagination::new(max_pages);
        let mut out = Vec::new();
        while let Some(n) = pager.next_page() {
            let url = page_url(&start, n);
            session.goto(&url)?;
            session.dismiss_cookie_banner();
            let page = match session.wait_for(JOB_TITLE, Duration::from_secs(20)) {
                Ok(()) => parse_listing(&session.content()?, &url)?,
                Err(e @ ScrapeError::Timeout { .. }) => return Err(e),
                Err(e) => {
                    last_miss = Some(e);
                    Page::default()
                }
            };
            if !pager.accept(page, &mut out) {
                break;
            }
        }
        tracing::debug!(source = CODE, start = %start, stop = ?pager.stop_reason(), count = out.len(), "listing walk done");
        if !out.is_empty() {
            return Ok(out);
        }
    }
    match last_miss {
        Some(e) => Err(e),
        None => Ok(Vec::new()),
    }
}

pub struct WtamuSource {
    settings: BrowserSettings,
    max_pages: usize,
}

impl WtamuSource {
    pub fn new(settings: BrowserSettings, max_pages: usize) -> Self {
        Self {
            settings,
            max_pages,
        }
    }
}

#[async_trait]
impl JobSource for WtamuSource {
    fn code(&self) -> &'static str {
        CODE
    }

    fn company(&self) -> &'static str {
        COMPANY
    }

    fn class(&self) -> VendorClass {
        VendorClass::BrowserRendered
    }

    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
        let settings = self.settings.clone();
        let max_pages = self.max_pages;
        let rows =
            run_blocking(settings.budget, move |deadline| crawl(&settings, max_pages, deadline))
                .await?;
        Ok(dedup_by_id_url(rows))
    }
}
