// src/ingest/providers/fmc.rs
//! FMC on Paycom's classic server-rendered job board. Paginated with
//! `&page=N`; when the list markup is missing, job ids are scraped from the
//! raw HTML and each detail page is read instead.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html};

use super::{absolutize, first_text, query_param, sel};
use crate::error::ScrapeError;
use crate::ingest::http::{polite_pause, Fetch};
use crate::ingest::pagination::{Page, Pagination};
use crate::ingest::text::{clean_text, truncate_chars};
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "fmc";
pub const COMPANY: &str = "FMC";
pub const BASE: &str = "https://www.paycomonline.net";
pub const CLIENT_KEY: &str = "51CCB437D1A5BB8EA54B11A3C07895CA";
const DETAIL_PATH: &str = "/v4/ats/web.php/jobs/ViewJobDetails";

pub fn list_url() -> String {
    format!("{BASE}/v4/ats/web.php/jobs?clientkey={CLIENT_KEY}")
}

pub fn page_url(page: usize) -> String {
    if page <= 1 {
        list_url()
    } else {
        format!("{}&page={page}", list_url())
    }
}

fn detail_url(job_id: &str) -> String {
    format!("{BASE}{DETAIL_PATH}?clientkey={CLIENT_KEY}&job={job_id}")
}

fn re_place() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"([^,]+),\s*([A-Z]{2})(?:,\s*(\d{5}))?$").expect("static regex")
    })
}

fn re_job_ids() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"ViewJobDetails[^"'>]+?job=(\d+)"#).expect("static regex"))
}

/// Paycom's location line: `Full Time | Service - Amarillo, TX, 79118`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocationLine {
    pub job_type: Option<String>,
    pub department: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub place: String,
}

pub fn parse_location_line(text: &str) -> LocationLine {
    let s = text.trim();
    let (job_type, right) = match s.split_once('|') {
        Some((l, r)) => (Some(l.trim().to_string()), r.trim()),
        None => (None, s),
    };
    let (department, place) = match right.split_once(" - ") {
        Some((l, r)) => (Some(l.trim().to_string()), r.trim()),
        None => (None, right),
    };
    let mut line = LocationLine {
        job_type: job_type.filter(|v| !v.is_empty()),
        department: department.filter(|v| !v.is_empty()),
        place: if place.is_empty() { s.to_string() } else { place.to_string() },
        ..Default::default()
    };
    if let Some(c) = re_place().captures(place) {
        line.city = c.get(1).map(|m| m.as_str().trim().to_string());
        line.state = c.get(2).map(|m| m.as_str().to_string());
        line.postal_code = c.get(3).map(|m| m.as_str().to_string());
    }
    line
}

fn record(job_id: Option<String>, title: Option<String>, url: String, loc: LocationLine, snippet: String) -> RawPosting {
    RawPosting::new()
        .with("job_id", job_id)
        .with("title", title)
        .with("url", url)
        .with("location_raw", Some(loc.place).filter(|p| !p.is_empty()))
        .with("job_type", loc.job_type)
        .with("department", loc.department)
        .with("city", loc.city)
        .with("state", loc.state)
        .with("postal_code", loc.postal_code)
        .with("description_snippet", Some(truncate_chars(&snippet, 400)).filter(|s| !s.is_empty()))
}

fn parse_card(card: ElementRef<'_>, base: &str) -> Result<Option<RawPosting>, ScrapeError> {
    let is_anchor = card.value().name() == "a";
    let anchor = if is_anchor {
        Some(card)
    } else {
        let a_sel = sel("a.JobListing__container[href], a[href*='ViewJobDetails']", base)?;
        card.select(&a_sel).next()
    };
    let Some(anchor) = anchor else {
        return Ok(None);
    };
    let Some(url) = anchor.value().attr("href").and_then(|h| absolutize(BASE, h)) else {
        return Ok(None);
    };
    let job_id = query_param(&url, "job");

    let title_sel = sel("span.jobInfoLine.jobTitle", base)?;
    let loc_sel = sel("span.jobInfoLine.jobLocation", base)?;
    let desc_sel = sel("span.jobInfoLine.jobDescription", base)?;

    let title = if is_anchor {
        super::text_of(anchor)
    } else {
        first_text(card, &title_sel).or_else(|| super::text_of(anchor))
    };
    let loc = parse_location_line(&first_text(card, &loc_sel).unwrap_or_default());
    let snippet = first_text(card, &desc_sel).unwrap_or_default();
    Ok(Some(record(job_id, title, url, loc, snippet)))
}

/// Result of reading one list page.
#[derive(Debug)]
pub enum ListPage {
    Cards(Page),
    /// No list markup; job ids found in the raw HTML instead.
    Fallback(Vec<String>),
}

pub fn parse_list_page(html: &str, url: &str) -> Result<ListPage, ScrapeError> {
    let doc = Html::parse_document(html);
    let mut cards: Vec<ElementRef<'_>> = Vec::new();
    for css in [
        "li.jobInfo.JobListing",
        "li.JobListing, li.jobListing, li[class*='JobListing']",
        "a.JobListing__container[href*='ViewJobDetails'], a[href*='ViewJobDetails?']",
    ] {
        let s = sel(css, url)?;
        cards = doc.select(&s).collect();
        if !cards.is_empty() {
            break;
        }
    }

    if cards.is_empty() {
        let ids: BTreeSet<String> = re_job_ids()
            .captures_iter(html)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();
        return Ok(ListPage::Fallback(ids.into_iter().collect()));
    }

    let mut page = Page::default();
    for card in cards {
        if let Some(rec) = parse_card(card, url)? {
            let key = rec
                .get_str("job_id")
                .or_else(|| rec.get_str("url"))
                .unwrap_or_default()
                .to_string();
            page.keys.push(key);
            page.records.push(rec);
        }
    }
    Ok(ListPage::Cards(page))
}

/// Text of the element following a label like `Job Location`.
fn text_after_label(doc: &Html, label: &str, url: &str) -> Result<Option<String>, ScrapeError> {
    let any = sel("body *", url)?;
    for el in doc.select(&any) {
        let own: String = el
            .children()
            .filter_map(|c| c.value().as_text().map(|t| String::from(&**t)))
            .collect();
        if !clean_text(&own).to_lowercase().starts_with(&label.to_lowercase()) {
            continue;
        }
        let next = el.next_siblings().filter_map(ElementRef::wrap).next();
        return Ok(next.and_then(super::text_of));
    }
    Ok(None)
}

pub fn parse_detail(html: &str, job_id: &str) -> Result<RawPosting, ScrapeError> {
    let url = detail_url(job_id);
    let doc = Html::parse_document(html);
    let h_sel = sel("h1, h2, #content h1", &url)?;
    let title = doc.select(&h_sel).next().and_then(super::text_of);
    let loc_raw = text_after_label(&doc, "Job Location", &url)?.unwrap_or_default();
    let job_type = text_after_label(&doc, "Position Type", &url)?;

    let mut loc = parse_location_line(&loc_raw);
    loc.job_type = job_type;
    Ok(record(Some(job_id.to_string()), title, url, loc, String::new()))
}

pub struct FmcSource {
    fetcher: Arc<dyn Fetch>,
    max_pages: usize,
    polite: bool,
}

impl FmcSource {
    pub fn new(fetcher: Arc<dyn Fetch>, max_pages: usize, polite: bool) -> Self {
        Self {
            fetcher,
            max_pages,
            polite,
        }
    }

    async fn fetch_details(&self, ids: Vec<String>) -> Vec<RawPosting> {
        let mut out = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                polite_pause(self.polite).await;
            }
            let url = detail_url(id);
            let parsed = match self.fetcher.get_text(&url, Some(&list_url())).await {
                Ok(html) => parse_detail(&html, id),
                Err(e) => Err(e),
            };
            match parsed {
                Ok(rec) => out.push(rec),
                Err(e) => {
                    tracing::warn!(source = CODE, %url, stage = "detail", error = %e, "skipping job page")
                }
            }
        }
        out
    }
}

#[async_trait]
impl JobSource for FmcSource {
    fn code(&self) -> &'static str {
        CODE
    }

    fn company(&self) -> &'static str {
        COMPANY
    }

    fn class(&self) -> VendorClass {
        VendorClass::StaticHtml
    }

    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError> {
        let mut pager = Pagination::new(self.max_pages);
        let mut out = Vec::new();

        while let Some(n) = pager.next_page() {
            let url = page_url(n);
            let body = self.fetcher.get_text(&url, Some(&list_url())).await?;
            match parse_list_page(&body, &url)? {
                ListPage::Cards(page) => {
                    if !pager.accept(page, &mut out) {
                        break;
                    }
                }
                ListPage::Fallback(ids) => {
                    tracing::info!(source = CODE, page = n, ids = ids.len(), "list markup missing, reading detail pages");
                    out.extend(self.fetch_details(ids).await);
                    break;
                }
            }
        }
        tracing::debug!(source = CODE, stop = ?pager.stop_reason(), count = out.len(), "pagination done");
        Ok(out)
    }
}
