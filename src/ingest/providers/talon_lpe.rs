// src/ingest/providers/talon_lpe.rs
//! Talon/LPE: an employment page with a table of TeamEngine apply links,
//! injected client side.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use super::sel;
use crate::error::ScrapeError;
use crate::ingest::browser::{run_blocking, BrowserSession, BrowserSettings, Deadline};
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "talon-lpe";
pub const COMPANY: &str = "Talon/LPE";
pub const LIST_URL: &str = "https://www.talonlpe.com/employment";
const APPLY_LINK: &str = r#"a[href^="https://apply.teamengine.io/apply/"]"#;

/// Last path segment of a TeamEngine apply link.
pub fn teamengine_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

pub fn parse_table(html: &str) -> Result<Vec<RawPosting>, ScrapeError> {
    let doc = Html::parse_document(html);
    let row_sel = sel("tr", LIST_URL)?;
    let link_sel = sel(APPLY_LINK, LIST_URL)?;
    let td_sel = sel("td", LIST_URL)?;

    let mut out = Vec::new();
    for row in doc.select(&row_sel) {
        let Some(anchor) = row.select(&link_sel).next() else {
            continue;
        };
        let url = anchor.value().attr("href").unwrap_or_default().trim();
        let Some(title) = super::text_of(anchor) else {
            continue;
        };
        if url.is_empty() {
            continue;
        }
        let location = row.select(&td_sel).nth(1).and_then(super::text_of);
        out.push(
            RawPosting::new()
                .with("id", teamengine_id(url))
                .with("title", title)
                .with("location", location)
                .with("url", url),
        );
    }
    Ok(out)
}

pub struct TalonLpeSource {
    settings: BrowserSettings,
}

impl TalonLpeSource {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

fn render(settings: &BrowserSettings, deadline: Deadline) -> Result<String, ScrapeError> {
    let session = BrowserSession::launch(CODE, &settings.user_agent, deadline)?;
    session.goto(LIST_URL)?;
    session.dismiss_cookie_banner();
    session.wait_for(APPLY_LINK, Duration::from_secs(20))?;
    session.content()
}

#[async_trait]
impl JobSource for TalonLpeSource {
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
        let html =
            run_blocking(settings.budget, move |deadline| render(&settings, deadline)).await?;
        parse_table(&html)
    }
}
