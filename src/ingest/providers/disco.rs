// src/ingest/providers/disco.rs
//! DISCO Inc. lists openings as links to Striven job pages; title and
//! location only exist on each job page.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::Html;

use super::{absolutize, query_param, sel};
use crate::error::ScrapeError;
use crate::ingest::http::{polite_pause, Fetch};
use crate::ingest::text::{clean_text, slug, truncate_chars};
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "disco";
pub const COMPANY: &str = "DISCO Inc.";
pub const LIST_URL: &str = "https://www.disco-inc.com/careers";

fn re_job_title_label() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*Job\s+Title\s*:?\s*$").expect("static regex"))
}

fn re_location_label() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*Location\s*:?\s*$").expect("static regex"))
}

fn re_apply_prefix() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*Apply\s*-\s*").expect("static regex"))
}

pub struct DiscoSource {
    fetcher: Arc<dyn Fetch>,
    polite: bool,
}

impl DiscoSource {
    pub fn new(fetcher: Arc<dyn Fetch>, polite: bool) -> Self {
        Self { fetcher, polite }
    }
}

/// A Striven link found on the careers page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLink {
    pub url: String,
    pub link_id: Option<String>,
}

/// Striven job links in page order, one per `LinkID`.
pub fn parse_links(html: &str, base: &str) -> Result<Vec<JobLink>, ScrapeError> {
    let doc = Html::parse_document(html);
    let a_sel = sel(r#"a[href*="share.striven.com/Job"]"#, base)?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for a in doc.select(&a_sel) {
        let Some(url) = a.value().attr("href").and_then(|h| absolutize(base, h)) else {
            continue;
        };
        let link_id = query_param(&url, "LinkID");
        if let Some(id) = &link_id {
            if !seen.insert(id.clone()) {
                continue;
            }
        }
        out.push(JobLink { url, link_id });
    }
    Ok(out)
}

/// Value following a label text node like `Location:`.
fn text_after_label(pieces: &[String], label: &Regex) -> Option<String> {
    let idx = pieces.iter().position(|p| label.is_match(p))?;
    pieces[idx + 1..]
        .iter()
        .map(|p| clean_text(p))
        .find(|p| !p.is_empty())
}

/// (title, location) from a Striven job page.
pub fn parse_detail(html: &str, url: &str) -> Result<(Option<String>, Option<String>), ScrapeError> {
    let doc = Html::parse_document(html);
    let pieces: Vec<String> = doc
        .root_element()
        .text()
        .map(str::to_string)
        .filter(|t| !t.trim().is_empty())
        .collect();

    let mut title = text_after_label(&pieces, re_job_title_label());
    if title.is_none() {
        let h_sel = sel("h1, h2", url)?;
        title = doc
            .select(&h_sel)
            .next()
            .and_then(super::text_of)
            .map(|h| {
                let stripped = re_apply_prefix().replace(&h, "").trim().to_string();
                if stripped.is_empty() {
                    h
                } else {
                    stripped
                }
            });
    }
    let location = text_after_label(&pieces, re_location_label());
    Ok((title, location))
}

#[async_trait]
impl JobSource for DiscoSource {
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
        let body = self.fetcher.get_text(LIST_URL, Some(LIST_URL)).await?;
        let links = parse_links(&body, LIST_URL)?;

        let mut out = Vec::with_capacity(links.len());
        for (i, link) in links.into_iter().enumerate() {
            if i > 0 {
                polite_pause(self.polite).await;
            }
            let detail = match self.fetcher.get_text(&link.url, Some(LIST_URL)).await {
                Ok(html) => parse_detail(&html, &link.url),
                Err(e) => Err(e),
            };
            let (title, location) = match detail {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(source = CODE, url = %link.url, stage = "detail", error = %e, "skipping job page");
                    continue;
                }
            };
            let Some(title) = title else {
                continue;
            };
            let id = link
                .link_id
                .clone()
                .unwrap_or_else(|| truncate_chars(&slug(&title), 90));
            out.push(
                RawPosting::new()
                    .with("id", id)
                    .with("title", title)
                    .with("location", location)
                    .with("url", link.url),
            );
        }
        Ok(out)
    }
}
