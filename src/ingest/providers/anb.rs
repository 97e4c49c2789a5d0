// src/ingest/providers/anb.rs
//! Amarillo National Bank publishes openings as CMS accordion shortcodes:
//! `{beginAccordion title="Region"} ... {endAccordion}` with one heading or
//! accordion button per job title. There is no per-job URL.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::ScrapeError;
use crate::ingest::http::Fetch;
use crate::ingest::text::{clean_text, slug, truncate_chars};
use crate::ingest::types::{JobSource, RawPosting, VendorClass};

pub const CODE: &str = "anb";
pub const COMPANY: &str = "Amarillo National Bank";
pub const LIST_URL: &str = "https://www.anb.com/about-anb/careers.html";

macro_rules! static_re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceCell<Regex> = OnceCell::new();
            RE.get_or_init(|| Regex::new($pat).expect("static regex"))
        }
    };
}

static_re!(re_begin, r"(?i)\{beginAccordion[^}]*\}");
static_re!(re_end, r"(?i)\{endAccordion\}");
static_re!(re_attr_title, r#"(?i)(?:title|heading|label)\s*[:=]\s*(?:"([^"]*)"|'([^']*)')"#);
static_re!(re_region_h2, r"(?is)<h2[^>]*>(.*?)</h2>");
static_re!(re_region_md, r"(?m)^##\s*([^\n<#][^\n<]*?)\s*$");
static_re!(
    re_btn_title,
    r#"(?is)<button[^>]*class="[^"]*accordion-button[^"]*"[^>]*>(.*?)</button>"#
);
static_re!(re_h3_title, r"(?is)<h3[^>]*>(.*?)</h3>");
static_re!(re_md_title, r"(?m)^###\s*([^\n<]+?)\s*$");
static_re!(re_state_suffix, r",\s*[A-Z]{2}$");

pub struct AnbSource {
    fetcher: Arc<dyn Fetch>,
}

impl AnbSource {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }
}

/// Regions are Texas cities unless they already end in a state code.
pub fn compose_location(region: Option<&str>) -> Option<String> {
    let region = region.map(str::trim).filter(|r| !r.is_empty())?;
    if re_state_suffix().is_match(region) {
        Some(region.to_string())
    } else {
        Some(format!("{region}, TX"))
    }
}

fn nearest_region(text: &str, begin: usize) -> Option<String> {
    let before = &text[..begin];
    if let Some(h2) = re_region_h2().captures_iter(before).last() {
        return h2.get(1).map(|m| clean_text(m.as_str()));
    }
    re_region_md()
        .captures_iter(before)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn titles_from_block(block: &str) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    let html_hits = re_btn_title()
        .captures_iter(block)
        .chain(re_h3_title().captures_iter(block))
        .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())));
    let md_hits = re_md_title()
        .captures_iter(block)
        .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_string()));
    for t in html_hits.chain(md_hits) {
        if !t.is_empty() && !titles.contains(&t) {
            titles.push(t);
        }
    }
    titles
}

pub fn parse_page(raw_html: &str, page_url: &str) -> Vec<RawPosting> {
    let text = html_escape::decode_html_entities(&raw_html.replace("\r\n", "\n").replace('\r', "\n"))
        .replace('\u{00A0}', " ");

    let mut out = Vec::new();
    let mut pos = 0usize;
    while let Some(mb) = re_begin().find_at(&text, pos) {
        let Some(me) = re_end().find_at(&text, mb.end()) else {
            break;
        };
        let block = &text[mb.end()..me.start()];

        let region = re_attr_title()
            .captures(mb.as_str())
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().trim().to_string())
            .or_else(|| nearest_region(&text, mb.start()));

        for title in titles_from_block(block) {
            let id = truncate_chars(
                &slug(&format!("{}-{}", region.as_deref().unwrap_or("anb"), title)),
                90,
            );
            out.push(
                RawPosting::new()
                    .with("id", id)
                    .with("title", title)
                    .with("location", compose_location(region.as_deref()))
                    .with("region", region.clone())
                    .with("url", page_url),
            );
        }
        pos = me.end();
    }
    out
}

#[async_trait]
impl JobSource for AnbSource {
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
        let jobs = parse_page(&body, LIST_URL);
        if jobs.is_empty() && !re_begin().is_match(&body) {
            return Err(ScrapeError::selector(
                LIST_URL,
                "{beginAccordion}",
                "careers page has no accordion blocks",
            ));
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_gets_texas_suffix_once() {
        assert_eq!(compose_location(Some("Lubbock")).as_deref(), Some("Lubbock, TX"));
        assert_eq!(
            compose_location(Some("Dallas, TX")).as_deref(),
            Some("Dallas, TX")
        );
        assert_eq!(compose_location(Some("  ")), None);
    }

    #[test]
    fn titles_are_deduplicated_in_order() {
        let block = r#"<h3>Teller</h3><button class="accordion-button collapsed">Teller</button>
### Loan Officer
"#;
        assert_eq!(titles_from_block(block), vec!["Teller", "Loan Officer"]);
    }
}
