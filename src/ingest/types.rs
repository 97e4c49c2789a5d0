// src/ingest/types.rs
use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ScrapeError;

/// Provider-shaped record as an adapter scraped it. Keys are whatever the
/// vendor calls them (`job_id`, `location_raw`, `applyUrl`, ...); the
/// normalizer maps them onto [`Posting`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPosting {
    pub fields: Map<String, Value>,
}

impl RawPosting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. `None` stores an explicit null.
    pub fn with<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn set<V: Into<Value>>(&mut self, key: &str, value: V) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Wrap a JSON object coming straight from a vendor API.
    pub fn from_json(v: Value) -> Option<Self> {
        match v {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }
}

/// Canonical posting. Field order is the artifact contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub id: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub url: Option<String>,
    #[serde(with = "scraped_at_format")]
    pub scraped_at: NaiveDateTime,
    pub source: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Posting {
    /// Count of populated optional fields; the dedup representative is the
    /// richest record of its group.
    pub fn richness(&self) -> usize {
        [&self.location, &self.salary, &self.url]
            .iter()
            .filter(|f| f.is_some())
            .count()
    }
}

pub const SCRAPED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub(crate) mod scraped_at_format {
    use super::SCRAPED_AT_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(SCRAPED_AT_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        crate::ingest::normalize::parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("bad scraped_at: {raw}")))
    }
}

/// How a partner's career site has to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorClass {
    StaticHtml,
    StructuredData,
    BrowserRendered,
}

impl VendorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticHtml => "static_html",
            Self::StructuredData => "structured_data",
            Self::BrowserRendered => "browser_rendered",
        }
    }
}

/// What the normalizer needs to know about the adapter a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMeta {
    pub code: &'static str,
    pub company: &'static str,
}

/// One partner career site. Implementations do network I/O only; they never
/// touch the artifact or shared state.
#[async_trait::async_trait]
pub trait JobSource: Send + Sync {
    /// Short vendor code written to `Posting::source`.
    fn code(&self) -> &'static str;
    /// Default company name for records that do not carry one.
    fn company(&self) -> &'static str;
    fn class(&self) -> VendorClass;
    async fn fetch(&self) -> Result<Vec<RawPosting>, ScrapeError>;

    fn meta(&self) -> SourceMeta {
        SourceMeta {
            code: self.code(),
            company: self.company(),
        }
    }
}
