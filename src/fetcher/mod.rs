//! Data fetcher: ticker → normalised shares series plus the live count, or an
//! explicit "unavailable".
//!
//! Provider failures never escape as faults. Every error, timeout and empty
//! answer becomes `FetchError::ProviderUnavailable`. Successful series are
//! cached per ticker for the configured TTL; failures are not cached.

use crate::cache::TtlCache;
use crate::config::{AppConfig, CacheConfig};
use crate::models::{ProviderSnapshot, SharesLookup, SharesRecord, SharesSeries};
use crate::provider::cleaner::{history_to_records, is_plausible_symbol, normalise_symbol};
use crate::provider::{SharesSource, YahooFinance};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const UNAVAILABLE_MESSAGE: &str =
    "Unable to fetch share data. This ticker may not exist or Yahoo Finance data unavailable.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Nothing was sent to the provider.
    #[error("{0:?} is not a valid ticker symbol")]
    InvalidInput(String),

    #[error("{}", UNAVAILABLE_MESSAGE)]
    ProviderUnavailable { symbol: String },
}

pub struct Fetcher {
    source: Arc<dyn SharesSource>,
    cache: Mutex<TtlCache<String, SharesLookup>>,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(source: Arc<dyn SharesSource>, cache: &CacheConfig, timeout: Duration) -> Self {
        Self {
            source,
            cache: Mutex::new(TtlCache::new(cache.ttl(), cache.capacity())),
            timeout,
        }
    }

    /// Yahoo Finance-backed fetcher from application config.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = YahooFinance::new(&config.provider).context("Failed to build provider")?;
        Ok(Self::new(
            Arc::new(source),
            &config.cache,
            config.provider.fetch_timeout(),
        ))
    }

    /// Trim + upper-case, then check it looks like a symbol.
    pub fn validate(ticker: &str) -> Result<String, FetchError> {
        let symbol = normalise_symbol(ticker);
        if is_plausible_symbol(&symbol) {
            Ok(symbol)
        } else {
            Err(FetchError::InvalidInput(ticker.trim().to_string()))
        }
    }

    pub async fn load_shares(&self, ticker: &str) -> Result<SharesLookup, FetchError> {
        let symbol = Self::validate(ticker)?;

        if let Some(lookup) = self.cache_lock().get(&symbol) {
            debug!("{}: cache hit", symbol);
            return Ok(lookup);
        }

        let fetch = self.source.fetch_snapshot(&symbol);
        let snapshot = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!("{}: provider error: {:#}", symbol, e);
                return Err(FetchError::ProviderUnavailable { symbol });
            }
            Err(_) => {
                warn!("{}: provider timed out after {:?}", symbol, self.timeout);
                return Err(FetchError::ProviderUnavailable { symbol });
            }
        };

        if snapshot.is_empty() {
            info!("{}: provider returned no share data", symbol);
            return Err(FetchError::ProviderUnavailable { symbol });
        }
        let Some(series) = snapshot_to_series(&snapshot, Utc::now().date_naive()) else {
            info!("{}: no usable share counts in provider data", symbol);
            return Err(FetchError::ProviderUnavailable { symbol });
        };

        info!("{}: {} periods", symbol, series.len());
        let lookup = SharesLookup {
            series,
            current_shares: snapshot.current_shares,
        };

        let mut cache = self.cache_lock();
        cache.purge_expired(Instant::now());
        cache.insert(symbol, lookup.clone());
        debug!("{} tickers cached", cache.len());
        Ok(lookup)
    }

    fn cache_lock(&self) -> std::sync::MutexGuard<'_, TtlCache<String, SharesLookup>> {
        // a panic mid-insert leaves the map itself intact
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Prefer history when it carries at least one reported count; otherwise a
/// single record dated `today` from the current count; otherwise nothing.
pub fn snapshot_to_series(snapshot: &ProviderSnapshot, today: NaiveDate) -> Option<SharesSeries> {
    if let Some(history) = &snapshot.history {
        let records = history_to_records(history);
        if records.iter().any(|r| r.shares_outstanding.is_some()) {
            return SharesSeries::new(records);
        }
    }

    snapshot
        .current_shares
        .and_then(|shares| SharesSeries::new(vec![SharesRecord::new(today, Some(shares))]))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FinancialHistory, FinancialRow};
    use crate::provider::testing::StaticSource;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn history(points: &[(&str, Option<f64>)]) -> FinancialHistory {
        FinancialHistory {
            rows: points
                .iter()
                .map(|(date, v)| FinancialRow {
                    period_label: date.to_string(),
                    items: [("annualOrdinarySharesNumber".to_string(), *v)].into_iter().collect(),
                })
                .collect(),
        }
    }

    fn fetcher(source: Arc<StaticSource>) -> Fetcher {
        Fetcher::new(source, &CacheConfig::default(), Duration::from_secs(5))
    }

    #[test]
    fn test_history_preferred_over_current() {
        let snapshot = ProviderSnapshot {
            current_shares: Some(5_000),
            history: Some(history(&[("2023-12-31", Some(1_100.0)), ("2022-12-31", Some(1_000.0))])),
        };
        let series = snapshot_to_series(&snapshot, today()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.latest().shares_outstanding, Some(1_100));
    }

    #[test]
    fn test_current_only_is_single_record() {
        let snapshot = ProviderSnapshot {
            current_shares: Some(5_000),
            history: None,
        };
        let series = snapshot_to_series(&snapshot, today()).unwrap();
        assert_eq!(series.records(), &[SharesRecord::new(today(), Some(5_000))]);
    }

    #[test]
    fn test_history_without_values_falls_back() {
        let snapshot = ProviderSnapshot {
            current_shares: Some(7),
            history: Some(history(&[("2023-12-31", None)])),
        };
        let series = snapshot_to_series(&snapshot, today()).unwrap();
        assert_eq!(series.len(), 1);

        let snapshot = ProviderSnapshot { current_shares: None, ..snapshot };
        assert!(snapshot_to_series(&snapshot, today()).is_none());
        assert!(snapshot_to_series(&ProviderSnapshot::default(), today()).is_none());
    }

    #[test]
    fn test_validate() {
        assert_eq!(Fetcher::validate(" aapl "), Ok("AAPL".to_string()));
        assert_eq!(Fetcher::validate("  "), Err(FetchError::InvalidInput(String::new())));
        assert!(matches!(Fetcher::validate("A B"), Err(FetchError::InvalidInput(_))));
    }

    #[test]
    fn test_empty_ticker_never_reaches_provider() {
        let source = Arc::new(StaticSource::ok(ProviderSnapshot {
            current_shares: Some(1),
            history: None,
        }));
        let fetcher = fetcher(source.clone());

        let err = tokio_test::block_on(fetcher.load_shares("")).unwrap_err();
        assert!(matches!(err, FetchError::InvalidInput(_)));
        assert_eq!(source.calls(), 0);
    }

    #[test]
    fn test_second_lookup_served_from_cache() {
        let source = Arc::new(StaticSource::ok(ProviderSnapshot {
            current_shares: None,
            history: Some(history(&[("2022-12-31", Some(1_000.0)), ("2023-12-31", Some(1_050.0))])),
        }));
        let fetcher = fetcher(source.clone());

        let first = tokio_test::block_on(fetcher.load_shares("acme")).unwrap();
        let second = tokio_test::block_on(fetcher.load_shares("ACME ")).unwrap();
        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_live_count_kept_alongside_history() {
        let source = Arc::new(StaticSource::ok(ProviderSnapshot {
            current_shares: Some(15_204_100_096),
            history: Some(history(&[("2022-12-31", Some(1_000.0)), ("2023-12-31", None)])),
        }));
        let fetcher = fetcher(source.clone());

        let lookup = tokio_test::block_on(fetcher.load_shares("AAPL")).unwrap();
        assert_eq!(lookup.current_shares, Some(15_204_100_096));
        assert_eq!(lookup.series.len(), 2);
        assert_eq!(lookup.series.latest().shares_outstanding, None);

        // cached hit carries it too
        let cached = tokio_test::block_on(fetcher.load_shares("aapl")).unwrap();
        assert_eq!(cached.current_shares, Some(15_204_100_096));
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn test_provider_error_is_unavailable_and_not_cached() {
        let source = Arc::new(StaticSource::failing());
        let fetcher = fetcher(source.clone());

        for _ in 0..2 {
            let err = tokio_test::block_on(fetcher.load_shares("ZZZZ")).unwrap_err();
            assert_eq!(err, FetchError::ProviderUnavailable { symbol: "ZZZZ".into() });
            assert_eq!(err.to_string(), UNAVAILABLE_MESSAGE);
        }
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_empty_snapshot_is_unavailable() {
        let source = Arc::new(StaticSource::ok(ProviderSnapshot::default()));
        let err = tokio_test::block_on(fetcher(source).load_shares("ACME")).unwrap_err();
        assert!(matches!(err, FetchError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let mut source = StaticSource::ok(ProviderSnapshot {
            current_shares: Some(1),
            history: None,
        });
        source.delay = Some(Duration::from_secs(60));
        let fetcher = Fetcher::new(
            Arc::new(source),
            &CacheConfig::default(),
            Duration::from_millis(50),
        );

        let err = fetcher.load_shares("SLOW").await.unwrap_err();
        assert!(matches!(err, FetchError::ProviderUnavailable { .. }));
    }
}
