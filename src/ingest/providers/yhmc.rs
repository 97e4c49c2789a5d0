// src/ingest/providers/yhmc.rs
use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;

use super::{absolutize, first_text, sel};
use crate::error::ScrapeError;
use crate::ingest::http::Fetch;
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "yhmc";
pub const COMPANY: &str = "Yellowhouse Machinery";
pub const LIST_URL: &str = "https://careers.yhmc.com/";

/// Yellowhouse Machinery: static listing cards, the only partner that
/// publishes salaries on the list page.
pub struct YhmcSource {
    fetcher: Arc<dyn Fetch>,
}

impl YhmcSource {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }
}

pub fn parse_listing(html: &str, base: &str) -> Result<Vec<RawPosting>, ScrapeError> {
    let doc = Html::parse_document(html);
    let card_sel = sel("div.listing", base)?;
    let title_sel = sel("h3.listing-title", base)?;
    let loc_sel = sel("li.udf-1960635 span.value", base)?;
    let salary_sel = sel("li.udf-salary span.value", base)?;
    let link_sel = sel("a[href]", base)?;

    let out = doc
        .select(&card_sel)
        .map(|card| {
            let href = card
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .unwrap_or_default();
            // listing slug without query string doubles as the vendor id
            let slug = href
                .split('?')
                .next()
                .unwrap_or_default()
                .trim_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string);

            RawPosting::new()
                .with("id", slug)
                .with("title", first_text(card, &title_sel))
                .with("location", first_text(card, &loc_sel))
                .with("salary", first_text(card, &salary_sel))
                .with("url", absolutize(base, href))
        })
        .collect();
    Ok(out)
}

#[async_trait]
impl JobSource for YhmcSource {
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
        let body = self.fetcher.get_text(LIST_URL, None).await?;
        parse_listing(&body, LIST_URL)
    }
}
