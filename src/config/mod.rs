use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Financial data provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Page hit once to obtain a session cookie before the crumb request.
    #[serde(default = "default_cookie_url")]
    pub cookie_url: String,

    /// Per-HTTP-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Budget for a whole provider lookup (all requests for one ticker).
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_history_years")]
    pub history_years: u32,

    #[serde(default)]
    pub frequency: Frequency,
}

/// Which periodic disclosures to read share counts from.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Annual,
    Quarterly,
}

impl Frequency {
    pub fn prefix(&self) -> &'static str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Quarterly => "quarterly",
        }
    }
}

/// Fetch cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Most tickers held at once; the least recently used is evicted first.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Web server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Most recent periods shown in the table.
    #[serde(default = "default_display_rows")]
    pub display_rows: usize,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://query2.finance.yahoo.com".to_string()
}
fn default_cookie_url() -> String {
    "https://fc.yahoo.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_fetch_timeout_secs() -> u64 {
    20
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; dilution-checker/0.1)".to_string()
}
fn default_history_years() -> u32 {
    5
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_capacity() -> usize {
    1024
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_display_rows() -> usize {
    8
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cookie_url: default_cookie_url(),
            timeout_secs: default_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            history_years: default_history_years(),
            frequency: Frequency::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            capacity: default_capacity(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            display_rows: default_display_rows(),
        }
    }
}

impl ProviderConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// A configured capacity of 0 is treated as 1.
    pub fn capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("DILUTION").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        cfg.try_deserialize().context("Invalid configuration")
    }
}
