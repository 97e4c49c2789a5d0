// src/ingest/normalize.rs
//! Record normalizer: provider-shaped [`RawPosting`] -> canonical [`Posting`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use metrics::counter;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::NormalizationError;
use crate::ingest::text::clean_text;
use crate::ingest::types::{Posting, RawPosting, SourceMeta};

// Provider spellings per canonical field, first match wins.
const ID_KEYS: &[&str] = &["id", "job_id", "jobId", "req_id", "requisition_id"];
const TITLE_KEYS: &[&str] = &["title", "name", "job_title"];
const COMPANY_KEYS: &[&str] = &["company", "company_name"];
const LOCATION_KEYS: &[&str] = &["location", "location_raw", "locationName"];
const SALARY_KEYS: &[&str] = &["salary", "pay", "compensation"];
const URL_KEYS: &[&str] = &["url", "applyUrl", "apply_url", "link", "href"];
const SCRAPED_AT_KEYS: &[&str] = &["scraped_at", "fetched_at"];

/// Second-precision UTC "now" without offset.
pub fn now_utc_seconds() -> NaiveDateTime {
    truncate_seconds(Utc::now().naive_utc())
}

fn truncate_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Parse the timestamp spellings adapters and old artifacts use. Offsets are
/// converted to UTC; naive values are taken as UTC. Sub-seconds are dropped.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(truncate_seconds(dt.with_timezone(&Utc).naive_utc()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(truncate_seconds(dt.with_timezone(&Utc).naive_utc()));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(truncate_seconds(naive));
        }
    }
    None
}

/// Content hash over the ordered tuple (title, company, location).
pub fn derive_id(title: &str, company: &str, location: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(company.as_bytes());
    hasher.update(b"|");
    hasher.update(location.unwrap_or_default().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Take the first present alias out of `fields` and render it as cleaned text.
/// Null, or a string with nothing but whitespace in it.
fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => clean_text(s).is_empty(),
        _ => false,
    }
}

fn take_scalar(
    raw: &mut RawPosting,
    keys: &[&str],
    field: &'static str,
) -> Result<Option<String>, NormalizationError> {
    let mut found = None;
    for k in keys {
        if let Some(v) = raw.fields.remove(*k) {
            // later aliases are consumed too so they do not leak into `extra`
            if found.as_ref().map_or(true, is_blank) {
                found = Some(v);
            }
        }
    }
    match found {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(clean_text(&s)).filter(|t| !t.is_empty())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(Value::Array(_)) | Some(Value::Object(_)) => {
            Err(NormalizationError::Unmappable { field })
        }
    }
}

/// Map one provider record onto the canonical schema.
///
/// `fetched_at` is the batch time used when the record has no timestamp of
/// its own.
pub fn normalize_record(
    mut raw: RawPosting,
    meta: &SourceMeta,
    fetched_at: NaiveDateTime,
) -> Result<Posting, NormalizationError> {
    let native_id = take_scalar(&mut raw, ID_KEYS, "id")?;
    let title = take_scalar(&mut raw, TITLE_KEYS, "title")?
        .ok_or(NormalizationError::MissingTitle)?;
    let company =
        take_scalar(&mut raw, COMPANY_KEYS, "company")?.unwrap_or_else(|| meta.company.to_string());
    let location = take_scalar(&mut raw, LOCATION_KEYS, "location")?;
    let salary = take_scalar(&mut raw, SALARY_KEYS, "salary")?;
    let url = take_scalar(&mut raw, URL_KEYS, "url")?;
    let scraped_at = take_scalar(&mut raw, SCRAPED_AT_KEYS, "scraped_at")?
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(|| truncate_seconds(fetched_at));
    // `source` is always the adapter's code, never a provider value
    raw.fields.remove("source");

    let id = match native_id {
        Some(native) => format!("{}:{}", meta.code, native),
        None => derive_id(&title, &company, location.as_deref()),
    };

    let extra: BTreeMap<String, Value> = raw
        .fields
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .collect();

    Ok(Posting {
        id: Some(id),
        title: Some(title),
        company: Some(company),
        location,
        salary,
        url,
        scraped_at,
        source: meta.code.to_string(),
        extra,
    })
}

/// Normalize a whole adapter batch. Unmappable records are dropped with a
/// warning. Returns (postings, dropped).
pub fn normalize_batch(
    raws: Vec<RawPosting>,
    meta: &SourceMeta,
    fetched_at: NaiveDateTime,
) -> (Vec<Posting>, usize) {
    let mut out = Vec::with_capacity(raws.len());
    let mut dropped = 0usize;
    for (idx, raw) in raws.into_iter().enumerate() {
        match normalize_record(raw, meta, fetched_at) {
            Ok(p) => out.push(p),
            Err(e) => {
                dropped += 1;
                tracing::warn!(source = meta.code, index = idx, error = %e, "dropping record");
            }
        }
    }
    if dropped > 0 {
        counter!("normalize_dropped_total", "source" => meta.code).increment(dropped as u64);
    }
    (out, dropped)
}
