// src/ingest/providers/ttuhsc.rs
//! TTUHSC on BrassRing. The search UI is an Angular app: the Amarillo campus
//! filter has to be applied through the Advanced Search panel (or a keyword
//! search when the panel does not load), then results are walked with the
//! Next / Load more controls.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;

use super::{absolutize, dedup_by_id_url, first_text, query_param, sel};
use crate::error::ScrapeError;
use crate::ingest::browser::{run_blocking, BrowserSession, BrowserSettings, Deadline};
use crate::ingest::pagination::{Page, Pagination};
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "ttuhsc";
pub const COMPANY: &str = "Texas Tech University Health Sciences Center";
pub const START_URL: &str = "https://sjobs.brassring.com/TGnewUI/Search/Home/Home?partnerid=25898&siteid=5283#Campus=HSC%20-%20Amarillo&keyWordSearch=";
pub const CARD: &str = "div.liner.lightBorder";
pub const JOB_ANCHOR: &str = "div.liner.lightBorder a.jobProperty.jobtitle";
const LOCATION: &str = "p.jobProperty.position1";
const CAMPUS_LABEL: &str = "hsc - amarillo";
const KEYWORD: &str = "Amarillo, Texas";

const KEYWORD_INPUTS: &[&str] = &[
    "input#keywordsearch",
    "input[name='keywordsearch']",
    "input[ng-model*='Keyword']",
    "input[placeholder*='keyword' i]",
    "input[aria-label*='keyword' i]",
    "input[type='search']",
];

const APPLY_BUTTONS: &[&str] = &["search", "apply", "done", "update", "go"];

const NEXT_CONTROLS: &[&str] = &[
    r#"a[aria-label="Next"]:not([aria-disabled="true"])"#,
    r#"button[aria-label="Next"]:not([disabled])"#,
    "li.paginationNext a",
    r#"a[title="Next"]"#,
];

/// Result cards currently rendered. Keys are the job id, else the link.
pub fn parse_results(html: &str) -> Result<Page, ScrapeError> {
    let doc = Html::parse_document(html);
    let card_sel = sel(CARD, START_URL)?;
    let anchor_sel = sel("a.jobProperty.jobtitle", START_URL)?;
    let loc_sel = sel(LOCATION, START_URL)?;

    let mut page = Page::default();
    for card in doc.select(&card_sel) {
        let Some(anchor) = card.select(&anchor_sel).next() else {
            continue;
        };
        let href = anchor.value().attr("href").unwrap_or_default();
        let url = absolutize(START_URL, href);
        let id = url.as_deref().and_then(|u| query_param(u, "jobid"));
        let key = id.clone().or_else(|| url.clone()).unwrap_or_default();

        page.keys.push(key);
        page.records.push(
            RawPosting::new()
                .with("id", id)
                .with("title", super::text_of(anchor))
                .with("location", first_text(card, &loc_sel))
                .with("url", url),
        );
    }
    Ok(page)
}

/// Results that mention no Amarillo location at all mean the campus filter
/// never took effect and the list is the whole university system.
pub fn check_campus(rows: &[RawPosting]) -> Result<(), ScrapeError> {
    if rows.is_empty() {
        return Ok(());
    }
    let any_amarillo = rows.iter().any(|r| {
        r.get_str("location")
            .is_some_and(|l| l.to_lowercase().contains("amarillo"))
    });
    if any_amarillo {
        Ok(())
    } else {
        Err(ScrapeError::selector(
            START_URL,
            "label.checkboxLabel",
            format!("campus filter not applied: none of {} results is in Amarillo", rows.len()),
        ))
    }
}

fn keyword_fallback(session: &BrowserSession) -> bool {
    for css in KEYWORD_INPUTS {
        if session.count(css) == 0 {
            continue;
        }
        if session.fill_and_submit(css, KEYWORD)
            && session.wait_for(JOB_ANCHOR, Duration::from_secs(20)).is_ok()
        {
            tracing::debug!(source = CODE, input = css, "keyword search submitted");
            return true;
        }
    }
    false
}

fn apply_campus_filter(session: &BrowserSession) {
    let opened = session.click_matching("a", |t| t == "advanced search")
        || session.click_matching(".powerSearchLink a.UnderLineLink", |t| {
            t.contains("advanced search")
        });
    if !opened || session.wait_for("label.checkboxLabel", Duration::from_secs(10)).is_err() {
        tracing::info!(source = CODE, "advanced search unavailable, using keyword search");
        keyword_fallback(session);
        return;
    }

    if !session.click_matching("label.checkboxLabel", |t| t.contains(CAMPUS_LABEL)) {
        tracing::warn!(source = CODE, label = CAMPUS_LABEL, "campus checkbox not found");
    }
    for name in APPLY_BUTTONS {
        if session.click_matching("button", |t| t == *name) {
            break;
        }
    }
    // a failed wait shows up as an empty first page
    let _ = session.wait_for(JOB_ANCHOR, Duration::from_secs(20));
}

/// Advance to the next batch. `false` when no control moved the list.
fn advance(session: &BrowserSession) -> bool {
    session.scroll_to_bottom();
    let prev = session.count(JOB_ANCHOR);
    if session.check().is_err() {
        return false;
    }
    let clicked = NEXT_CONTROLS.iter().any(|css| session.click_first(css))
        || session.click_matching("button", |t| t == "load more" || t == "show more");
    if !clicked {
        return false;
    }
    session.wait_for_count_above(JOB_ANCHOR, prev, Duration::from_secs(10))
        || session.wait_for(JOB_ANCHOR, Duration::from_secs(10)).is_ok()
}

fn crawl(
    settings: &BrowserSettings,
    max_pages: usize,
    deadline: Deadline,
) -> Result<Vec<RawPosting>, ScrapeError> {
    let session = BrowserSession::launch(CODE, &settings.user_agent, deadline)?;
    session.goto(START_URL)?;
    session.dismiss_cookie_banner();
    apply_campus_filter(&session);
    session.wait_for(JOB_ANCHOR, Duration::from_secs(25))?;

    let mut pager = Pagination::new(max_pages);
    let mut out = Vec::new();
    while pager.next_page().is_some() {
        let page = parse_results(&session.content()?)?;
        if !pager.accept(page, &mut out) || !advance(&session) {
            break;
        }
    }
    // a list cut short by the budget is not a complete result
    session.check()?;
    tracing::debug!(source = CODE, stop = ?pager.stop_reason(), count = out.len(), "result walk done");
    Ok(out)
}

pub struct TtuhscSource {
    settings: BrowserSettings,
    max_pages: usize,
}

impl TtuhscSource {
    pub fn new(settings: BrowserSettings, max_pages: usize) -> Self {
        Self {
            settings,
            max_pages,
        }
    }
}

#[async_trait]
impl JobSource for TtuhscSource {
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
        let rows = dedup_by_id_url(rows);
        check_campus(&rows)?;
        Ok(rows)
    }
}
