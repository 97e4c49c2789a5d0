// src/ingest/providers/mod.rs
//! One adapter per partner career site.

pub mod anb;
pub mod austin_hose;
pub mod disco;
pub mod fmc;
pub mod sage_oil_vac;
pub mod talon_lpe;
pub mod ttuhsc;
pub mod western_equipment;
pub mod wtamu;
pub mod yhmc;

use std::collections::HashSet;

use scraper::{ElementRef, Selector};
use url::Url;

use crate::error::ScrapeError;
use crate::ingest::text::clean_text;
use crate::ingest::types::RawPosting;

/// Compile a CSS selector; a bad one surfaces as a selector error for `url`.
pub(crate) fn sel(css: &str, url: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::selector(url, css, e.to_string()))
}

/// Cleaned text content of an element, `None` when blank.
pub(crate) fn text_of(el: ElementRef<'_>) -> Option<String> {
    let t = clean_text(&el.text().collect::<Vec<_>>().join(" "));
    (!t.is_empty()).then_some(t)
}

/// Cleaned text of the first `selector` match under `el`.
pub(crate) fn first_text(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector).next().and_then(text_of)
}

/// Resolve `href` against `base`.
pub(crate) fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .ok()
}

/// First value of query parameter `key` (case-insensitive name).
pub(crate) fn query_param(url: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Nearest ancestor element named `tag`.
pub(crate) fn closest<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == tag)
}

/// Drop repeats of the same (id, url) pair, keeping first-seen order.
pub(crate) fn dedup_by_id_url(rows: Vec<RawPosting>) -> Vec<RawPosting> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| {
            let key = (
                r.get_str("id").map(str::to_string),
                r.get_str("url").map(str::to_string),
            );
            seen.insert(key)
        })
        .collect()
}
