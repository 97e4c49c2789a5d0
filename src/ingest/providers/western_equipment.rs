// src/ingest/providers/western_equipment.rs
//! Western Equipment on Paycom's v4 single-page job portal. The list only
//! exists after the app has rendered, so the page goes through Chrome and
//! the rendered DOM is parsed like any static page.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{absolutize, query_param, sel};
use crate::error::ScrapeError;
use crate::ingest::browser::{run_blocking, BrowserSession, BrowserSettings, Deadline};
use crate::ingest::text::truncate_chars;
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "western-equipment";
pub const COMPANY: &str = "Western Equipment";
pub const ORIGIN: &str = "https://www.paycomonline.net";
pub const LIST_URL: &str =
    "https://www.paycomonline.net/v4/ats/web.php/jobs?clientkey=BEC705AAE8346DB92E3A5C60250EE84C";
pub const JOB_LINK: &str =
    r#"a[href*="/v4/ats/web.php/portal/BEC705AAE8346DB92E3A5C60250EE84C/jobs/"]"#;

fn re_jobs_path() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"/jobs/(\d+)").expect("static regex"))
}

/// Paycom job id from `?job=` or a `/jobs/<n>` path.
pub fn job_id_from_url(url: &str) -> Option<String> {
    query_param(url, "job").or_else(|| {
        let path = url::Url::parse(url).ok()?.path().to_string();
        re_jobs_path()
            .captures(&path)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

fn card(
    anchor: ElementRef<'_>,
    heading: &Selector,
    typo: &Selector,
    fallback_h2: &Selector,
) -> Option<RawPosting> {
    let url = anchor.value().attr("href").and_then(|h| absolutize(ORIGIN, h))?;
    let title = anchor
        .select(heading)
        .next()
        .or_else(|| anchor.select(fallback_h2).next())
        .and_then(super::text_of)?;
    let mut paragraphs = anchor.select(typo).map(super::text_of);
    let location = paragraphs.next().flatten();
    let summary = paragraphs.next().flatten();

    let id = job_id_from_url(&url).unwrap_or_else(|| truncate_chars(&title, 90));
    Some(
        RawPosting::new()
            .with("id", id)
            .with("title", title)
            .with("location", location)
            .with("url", url)
            .with("summary", summary),
    )
}

/// Job cards from the rendered portal. Anchors without a title or link are skipped.
pub fn parse_rendered(html: &str) -> Result<Vec<RawPosting>, ScrapeError> {
    let doc = Html::parse_document(html);
    let link_sel = sel(JOB_LINK, LIST_URL)?;
    let heading = sel(r#"h2[data-testid="typography"]"#, LIST_URL)?;
    let fallback_h2 = sel("h2", LIST_URL)?;
    let typo = sel(r#"p[data-testid="typography"]"#, LIST_URL)?;

    Ok(doc
        .select(&link_sel)
        .filter_map(|a| card(a, &heading, &typo, &fallback_h2))
        .collect())
}

pub struct WesternEquipmentSource {
    settings: BrowserSettings,
}

impl WesternEquipmentSource {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

fn render(settings: &BrowserSettings, deadline: Deadline) -> Result<String, ScrapeError> {
    let session = BrowserSession::launch(CODE, &settings.user_agent, deadline)?;
    session.goto(LIST_URL)?;
    session.dismiss_cookie_banner();
    session.wait_for(JOB_LINK, Duration::from_secs(20))?;
    session.content()
}

#[async_trait]
impl JobSource for WesternEquipmentSource {
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
        parse_rendered(&html)
    }
}
