// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "JOBS_CONFIG_PATH";
pub const ENV_OUTPUT_PATH: &str = "JOBS_OUTPUT_PATH";
pub const ENV_SOURCES: &str = "JOBS_SOURCES";
pub const ENV_PARALLEL: &str = "JOBS_PARALLEL";
pub const ENV_BROWSER: &str = "JOBS_BROWSER";
pub const ENV_METRICS_TEXTFILE: &str = "JOBS_METRICS_TEXTFILE";

pub const DEFAULT_OUTPUT_PATH: &str = "data/latest_jobs.json";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}
fn default_timeout_secs() -> u64 {
    180
}
fn default_max_pages() -> usize {
    10
}
fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_request_timeout_secs() -> u64 {
    20
}
fn default_retries() -> u8 {
    1
}
fn default_retry_delay_ms() -> u64 {
    750
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u8,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Enabled source codes; empty means every known source.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Per-adapter budget, covering pagination and detail fetches.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Hard ceiling for paginated adapters.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default)]
    pub parallel: bool,
    /// Run the adapters that need a headless Chrome.
    #[serde(default = "default_true")]
    pub browser: bool,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub metrics_textfile: Option<PathBuf>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            sources: Vec::new(),
            timeout_secs: default_timeout_secs(),
            max_pages: default_max_pages(),
            parallel: false,
            browser: true,
            http: HttpConfig::default(),
            metrics_textfile: None,
        }
    }
}

impl AggregatorConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $JOBS_CONFIG_PATH
    /// 2) config/aggregator.toml
    /// 3) config/aggregator.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = Self::load_file_default()?;
        cfg.apply_env();
        Ok(cfg)
    }

    fn load_file_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/aggregator.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/aggregator.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    pub fn apply_env(&mut self) {
        if let Ok(p) = std::env::var(ENV_OUTPUT_PATH) {
            if !p.trim().is_empty() {
                self.output_path = PathBuf::from(p.trim());
            }
        }
        if let Ok(list) = std::env::var(ENV_SOURCES) {
            self.sources = clean_list(list.split(',').map(str::to_string).collect());
        }
        if let Some(b) = env_bool(ENV_PARALLEL) {
            self.parallel = b;
        }
        if let Some(b) = env_bool(ENV_BROWSER) {
            self.browser = b;
        }
        if let Ok(p) = std::env::var(ENV_METRICS_TEXTFILE) {
            self.metrics_textfile = Some(PathBuf::from(p)).filter(|p| !p.as_os_str().is_empty());
        }
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let v = std::env::var(key).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AggregatorConfig> {
    // JSON configs start with `{`; anything else is tried as TOML first.
    let try_json_first = hint_ext == "json" || s.trim_start().starts_with('{');
    let parsed = if try_json_first {
        parse_json(s).or_else(|_| parse_toml(s))
    } else {
        parse_toml(s).or_else(|_| parse_json(s))
    };
    parsed.map_err(|_| anyhow!("unsupported config format"))
}

fn parse_toml(s: &str) -> Result<AggregatorConfig> {
    let mut cfg: AggregatorConfig = toml::from_str(s)?;
    cfg.sources = clean_list(cfg.sources);
    Ok(cfg)
}

fn parse_json(s: &str) -> Result<AggregatorConfig> {
    let mut cfg: AggregatorConfig = serde_json::from_str(s)?;
    cfg.sources = clean_list(cfg.sources);
    Ok(cfg)
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_ascii_lowercase());
        }
    }
    set.into_iter().collect()
}
