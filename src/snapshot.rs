// src/snapshot.rs
//! Read side of the artifact, as the dashboard consumes it. Nothing here
//! fails: a missing, empty or malformed file reads as no data.

use std::cmp::Reverse;
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::ingest::normalize::parse_timestamp;

/// One artifact row. Every core field may be absent in a hand-edited or
/// older artifact, so all of them are optional here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub url: Option<String>,
    pub scraped_at: Option<NaiveDateTime>,
    pub source: Option<String>,
}

fn field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl SnapshotEntry {
    /// `None` for anything that is not a JSON object.
    pub fn from_value(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        Some(Self {
            id: field(obj, "id"),
            title: field(obj, "title"),
            company: field(obj, "company"),
            location: field(obj, "location"),
            salary: field(obj, "salary"),
            url: field(obj, "url"),
            scraped_at: field(obj, "scraped_at").and_then(|s| parse_timestamp(&s)),
            source: field(obj, "source"),
        })
    }
}

/// Parse artifact text: a JSON array, or JSON lines as a fallback.
pub fn parse_snapshot(text: &str) -> Vec<SnapshotEntry> {
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return match v {
            Value::Array(items) => items.iter().filter_map(SnapshotEntry::from_value).collect(),
            obj @ Value::Object(_) => SnapshotEntry::from_value(&obj).into_iter().collect(),
            _ => Vec::new(),
        };
    }

    trimmed
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str::<Value>(l.trim()).ok())
        .filter_map(|v| SnapshotEntry::from_value(&v))
        .collect()
}

/// Load the artifact at `path`. Problems are logged and read as empty.
pub fn load_snapshot(path: &Path) -> Vec<SnapshotEntry> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "no snapshot to read");
            return Vec::new();
        }
    };
    let entries = parse_snapshot(&text);
    if entries.is_empty() && !text.trim().is_empty() && text.trim() != "[]" {
        tracing::warn!(path = %path.display(), "snapshot unreadable, showing no data");
    }
    entries
}

/// Dashboard filters; `None` or blank means no constraint.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFilter {
    /// Case-insensitive substring of the title.
    pub keyword: Option<String>,
    /// Exact company name (case-insensitive).
    pub company: Option<String>,
    /// Case-insensitive substring of the location, e.g. "Amarillo, TX".
    pub place: Option<String>,
}

fn wanted(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

impl SnapshotFilter {
    pub fn matches(&self, e: &SnapshotEntry) -> bool {
        let lower = |v: &Option<String>| v.as_deref().unwrap_or_default().to_lowercase();
        if let Some(k) = wanted(&self.keyword) {
            if !lower(&e.title).contains(&k) {
                return false;
            }
        }
        if let Some(c) = wanted(&self.company) {
            if lower(&e.company) != c {
                return false;
            }
        }
        if let Some(p) = wanted(&self.place) {
            if !lower(&e.location).contains(&p) {
                return false;
            }
        }
        true
    }

    /// Matching entries, newest first; rows without a timestamp go last.
    pub fn apply(&self, entries: &[SnapshotEntry]) -> Vec<SnapshotEntry> {
        let mut out: Vec<SnapshotEntry> = entries.iter().filter(|e| self.matches(e)).cloned().collect();
        out.sort_by_key(|e| Reverse(e.scraped_at));
        out
    }
}

/// Distinct company names, sorted case-insensitively.
pub fn companies(entries: &[SnapshotEntry]) -> Vec<String> {
    let mut names: Vec<String> = entries.iter().filter_map(|e| e.company.clone()).collect();
    names.sort_by_key(|n| n.to_lowercase());
    names.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_objects_and_blank_input_are_skipped() {
        assert!(parse_snapshot("").is_empty());
        assert!(parse_snapshot("   \n").is_empty());
        let rows = parse_snapshot(r#"[1, "x", {"title": "Nurse"}, null]"#);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title.as_deref(), Some("Nurse"));
        assert_eq!(rows[0].company, None);
    }

    #[test]
    fn companies_are_distinct_and_sorted() {
        let rows = parse_snapshot(
            r#"[{"company": "disco inc."}, {"company": "Amarillo National Bank"}, {"company": "DISCO Inc."}, {}]"#,
        );
        assert_eq!(companies(&rows), vec!["Amarillo National Bank", "disco inc."]);
    }
}
