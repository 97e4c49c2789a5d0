// src/ingest/providers/austin_hose.rs
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::Html;

use super::{absolutize, first_text, sel};
use crate::error::ScrapeError;
use crate::ingest::http::Fetch;
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "austin-hose";
pub const COMPANY: &str = "Austin Hose";
pub const LIST_URL: &str = "https://recruiting.paylocity.com/recruiting/jobs/All/0a932b3f-65a0-4207-b5be-70d84a78ecaa/Austin-Hose";

// Paylocity serves this instead of the listing to clients it takes for bots.
const JS_WALL_MARKER: &str = "In order to use this site, it is necessary to enable JavaScript.";
const ROW_SELECTOR: &str = "div.row.job-listing-job-item";

fn re_details_id() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"/Details/(\d+)").expect("static regex"))
}

/// Austin Hose on Paylocity's server-rendered job board.
pub struct AustinHoseSource {
    fetcher: Arc<dyn Fetch>,
}

impl AustinHoseSource {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }
}

pub fn parse_listing(html: &str, base: &str) -> Result<Vec<RawPosting>, ScrapeError> {
    if html.contains(JS_WALL_MARKER) {
        return Err(ScrapeError::selector(
            base,
            ROW_SELECTOR,
            "Paylocity returned its enable-JavaScript page instead of the listing",
        ));
    }

    let doc = Html::parse_document(html);
    let row_sel = sel(ROW_SELECTOR, base)?;
    let title_sel = sel(".job-title-column .job-item-title a", base)?;
    let loc_sel = sel(".location-column span", base)?;

    let mut out = Vec::new();
    for row in doc.select(&row_sel) {
        let Some(anchor) = row.select(&title_sel).next() else {
            continue;
        };
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        let url = absolutize(base, href).unwrap_or_else(|| base.to_string());
        let numeric_id = re_details_id()
            .captures(href)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        out.push(
            RawPosting::new()
                .with("id", numeric_id)
                .with("title", super::text_of(anchor))
                .with("location", first_text(row, &loc_sel))
                .with("url", url),
        );
    }
    Ok(out)
}

#[async_trait]
impl JobSource for AustinHoseSource {
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
        parse_listing(&body, LIST_URL)
    }
}
