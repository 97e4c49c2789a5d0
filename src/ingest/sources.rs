// src/ingest/sources.rs
//! Closed set of partner sources and the wiring from config to adapters.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AggregatorConfig;
use crate::ingest::browser::BrowserSettings;
use crate::ingest::http::Fetch;
use crate::ingest::providers::{
    anb, austin_hose, disco, fmc, sage_oil_vac, talon_lpe, ttuhsc, western_equipment, wtamu,
    yhmc,
};
use crate::ingest::types::{JobSource, VendorClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Yhmc,
    AustinHose,
    Anb,
    Disco,
    Fmc,
    SageOilVac,
    WesternEquipment,
    TalonLpe,
    Ttuhsc,
    Wtamu,
}

impl SourceId {
    /// Run order of a full aggregation.
    pub const ALL: [SourceId; 10] = [
        SourceId::Yhmc,
        SourceId::AustinHose,
        SourceId::Anb,
        SourceId::Disco,
        SourceId::Fmc,
        SourceId::SageOilVac,
        SourceId::WesternEquipment,
        SourceId::TalonLpe,
        SourceId::Ttuhsc,
        SourceId::Wtamu,
    ];

    pub fn code(self) -> &'static str {
        match self {
            SourceId::Yhmc => yhmc::CODE,
            SourceId::AustinHose => austin_hose::CODE,
            SourceId::Anb => anb::CODE,
            SourceId::Disco => disco::CODE,
            SourceId::Fmc => fmc::CODE,
            SourceId::SageOilVac => sage_oil_vac::CODE,
            SourceId::WesternEquipment => western_equipment::CODE,
            SourceId::TalonLpe => talon_lpe::CODE,
            SourceId::Ttuhsc => ttuhsc::CODE,
            SourceId::Wtamu => wtamu::CODE,
        }
    }

    pub fn class(self) -> VendorClass {
        match self {
            SourceId::SageOilVac => VendorClass::StructuredData,
            SourceId::WesternEquipment
            | SourceId::TalonLpe
            | SourceId::Ttuhsc
            | SourceId::Wtamu => VendorClass::BrowserRendered,
            _ => VendorClass::StaticHtml,
        }
    }

    /// Enabled sources for `cfg`, in run order. Unknown codes are logged and
    /// skipped; browser-rendered sources are skipped when the browser is off.
    pub fn from_config(cfg: &AggregatorConfig) -> Vec<SourceId> {
        let requested: Vec<SourceId> = if cfg.sources.is_empty() {
            Self::ALL.to_vec()
        } else {
            let mut picked = Vec::new();
            for code in &cfg.sources {
                match code.parse::<SourceId>() {
                    Ok(id) if !picked.contains(&id) => picked.push(id),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "ignoring configured source"),
                }
            }
            // keep run order independent of config order
            Self::ALL
                .into_iter()
                .filter(|id| picked.contains(id))
                .collect()
        };

        requested
            .into_iter()
            .filter(|id| {
                let keep = cfg.browser || id.class() != VendorClass::BrowserRendered;
                if !keep {
                    tracing::info!(source = id.code(), "browser adapters disabled, skipping");
                }
                keep
            })
            .collect()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSource(pub String);

impl fmt::Display for UnknownSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown source code `{}`", self.0)
    }
}

impl std::error::Error for UnknownSource {}

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|id| id.code() == wanted)
            .ok_or_else(|| UnknownSource(s.to_string()))
    }
}

/// Everything an adapter may need from the outside.
#[derive(Clone)]
pub struct SourceContext {
    pub fetcher: Arc<dyn Fetch>,
    pub max_pages: usize,
    pub browser: Option<BrowserSettings>,
    /// Jitter between per-job detail requests.
    pub polite: bool,
}

impl SourceContext {
    pub fn from_config(cfg: &AggregatorConfig, fetcher: Arc<dyn Fetch>) -> Self {
        let browser = cfg.browser.then(|| BrowserSettings {
            user_agent: cfg.http.user_agent.clone(),
            budget: Duration::from_secs(cfg.timeout_secs),
        });
        Self {
            fetcher,
            max_pages: cfg.max_pages,
            browser,
            polite: true,
        }
    }

    fn browser_settings(&self) -> BrowserSettings {
        self.browser.clone().unwrap_or_else(|| BrowserSettings {
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
            budget: Duration::from_secs(180),
        })
    }
}

/// Adapter for `id`.
pub fn build(id: SourceId, ctx: &SourceContext) -> Arc<dyn JobSource> {
    let fetcher = Arc::clone(&ctx.fetcher);
    match id {
        SourceId::Yhmc => Arc::new(yhmc::YhmcSource::new(fetcher)),
        SourceId::AustinHose => Arc::new(austin_hose::AustinHoseSource::new(fetcher)),
        SourceId::Anb => Arc::new(anb::AnbSource::new(fetcher)),
        SourceId::Disco => Arc::new(disco::DiscoSource::new(fetcher, ctx.polite)),
        SourceId::Fmc => Arc::new(fmc::FmcSource::new(fetcher, ctx.max_pages, ctx.polite)),
        SourceId::SageOilVac => Arc::new(sage_oil_vac::SageOilVacSource::new(
            fetcher,
            ctx.browser.clone(),
        )),
        SourceId::WesternEquipment => Arc::new(western_equipment::WesternEquipmentSource::new(
            ctx.browser_settings(),
        )),
        SourceId::TalonLpe => Arc::new(talon_lpe::TalonLpeSource::new(ctx.browser_settings())),
        SourceId::Ttuhsc => Arc::new(ttuhsc::TtuhscSource::new(
            ctx.browser_settings(),
            ctx.max_pages,
        )),
        SourceId::Wtamu => Arc::new(wtamu::WtamuSource::new(
            ctx.browser_settings(),
            ctx.max_pages,
        )),
    }
}

pub fn build_all(ids: &[SourceId], ctx: &SourceContext) -> Vec<Arc<dyn JobSource>> {
    ids.iter().map(|id| build(*id, ctx)).collect()
}
