pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::{Frequency, ProviderConfig};
use crate::models::{FinancialHistory, ProviderSnapshot};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use self::http_client::HttpClient;
use self::parsers::{parse_quote_summary, parse_timeseries};

/// Line items requested from the fundamentals timeseries, per frequency.
const HISTORY_ITEMS: [&str; 3] = ["OrdinarySharesNumber", "ShareIssued", "BasicAverageShares"];

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable share-count provider.
#[async_trait]
pub trait SharesSource: Send + Sync {
    /// Best-effort lookup; an unknown ticker may error or come back empty.
    async fn fetch_snapshot(&self, symbol: &str) -> Result<ProviderSnapshot>;
}

// ── Yahoo Finance ─────────────────────────────────────────────────────────────

pub struct YahooFinance {
    client: HttpClient,
    base_url: Url,
    cookie_url: String,
    frequency: Frequency,
    history_years: u32,
    crumb: Mutex<Option<String>>,
}

impl YahooFinance {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid provider base_url {:?}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Provider base_url {} cannot be a base", base_url));
        }

        Ok(Self {
            client: HttpClient::new(config)?,
            base_url,
            cookie_url: config.cookie_url.clone(),
            frequency: config.frequency,
            history_years: config.history_years,
            crumb: Mutex::new(None),
        })
    }

    /// `{base}/a/b/c` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Fundamentals timeseries for the share-count line items over `history_years`.
    fn timeseries_url(&self, symbol: &str, now: DateTime<Utc>) -> Url {
        let start = now
            .checked_sub_months(Months::new(self.history_years.saturating_mul(12)))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let types = HISTORY_ITEMS
            .iter()
            .map(|item| format!("{}{}", self.frequency.prefix(), item))
            .collect::<Vec<_>>()
            .join(",");

        let mut url = self.endpoint(&[
            "ws",
            "fundamentals-timeseries",
            "v1",
            "finance",
            "timeseries",
            symbol,
        ]);
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("type", &types)
            .append_pair("period1", &start.timestamp().to_string())
            .append_pair("period2", &now.timestamp().to_string());
        url
    }

    fn quote_summary_url(&self, symbol: &str, crumb: &str) -> Url {
        let mut url = self.endpoint(&["v10", "finance", "quoteSummary", symbol]);
        url.query_pairs_mut()
            .append_pair("modules", "defaultKeyStatistics")
            .append_pair("crumb", crumb);
        url
    }

    /// Session crumb, fetched once and reused until a quoteSummary call fails.
    async fn crumb(&self) -> Result<String> {
        let mut slot = self.crumb.lock().await;
        if let Some(crumb) = slot.as_ref() {
            return Ok(crumb.clone());
        }

        self.client.touch(&self.cookie_url).await.ok();
        let crumb = self
            .client
            .get_text(&self.endpoint(&["v1", "test", "getcrumb"]))
            .await
            .context("Crumb request failed")?;
        let crumb = crumb.trim().to_string();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(anyhow!("Provider returned no usable crumb"));
        }

        debug!("Obtained provider crumb");
        *slot = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_current_shares(&self, symbol: &str) -> Result<Option<u64>> {
        let crumb = self.crumb().await?;
        let url = self.quote_summary_url(symbol, &crumb);

        let result = match self.client.get_text(&url).await {
            Ok(body) => parse_quote_summary(&body),
            Err(e) => Err(e),
        };
        if result.is_err() {
            // stale crumbs surface as 401s; refresh on the next lookup
            *self.crumb.lock().await = None;
        }
        result.with_context(|| format!("Current shares lookup failed for {}", symbol))
    }

    async fn fetch_history(&self, symbol: &str) -> Result<Option<FinancialHistory>> {
        let url = self.timeseries_url(symbol, Utc::now());
        let body = self
            .client
            .get_text(&url)
            .await
            .with_context(|| format!("Share history lookup failed for {}", symbol))?;

        let history = parse_timeseries(&body)?;
        Ok(if history.rows.is_empty() { None } else { Some(history) })
    }
}

#[async_trait]
impl SharesSource for YahooFinance {
    async fn fetch_snapshot(&self, symbol: &str) -> Result<ProviderSnapshot> {
        let (current, history) = tokio::join!(
            self.fetch_current_shares(symbol),
            self.fetch_history(symbol),
        );

        match (current, history) {
            (Err(ce), Err(he)) => {
                warn!("{}: current shares: {:#}", symbol, ce);
                Err(he)
            }
            (current, history) => {
                let current_shares = current
                    .inspect_err(|e| warn!("{}: {:#}", symbol, e))
                    .ok()
                    .flatten();
                let history = history
                    .inspect_err(|e| warn!("{}: {:#}", symbol, e))
                    .ok()
                    .flatten();

                info!(
                    "{}: current={:?}, history rows={}",
                    symbol,
                    current_shares,
                    history.as_ref().map(|h| h.rows.len()).unwrap_or(0)
                );
                Ok(ProviderSnapshot { current_shares, history })
            }
        }
    }
}

// ── Test double ───────────────────────────────────────────────────────────────
