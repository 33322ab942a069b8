mod cache;
mod config;
mod dilution;
mod fetcher;
mod models;
mod provider;
mod server;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::AppConfig;
use crate::fetcher::Fetcher;
use crate::models::DilutionReport;

#[derive(Parser)]
#[command(name = "dilution-checker", about = "Stock dilution risk checker", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Start the web UI
    Serve {
        /// Override the configured listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check one ticker and print the result
    Check {
        /// Ticker symbol, e.g. AAPL
        ticker: String,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "dilution_checker=info,warn",
        1 => "dilution_checker=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            server::run(&config).await?;
        }

        Command::Check { ticker } => {
            let fetcher = Fetcher::from_config(&config)?;
            let report = {
                let _t = utils::Timer::start(format!("Dilution check {}", ticker.trim()));
                check(&fetcher, &ticker).await?
            };
            print_report(&report);
        }
    }

    Ok(())
}

/// Fetch + compute for one ticker. Invalid or unavailable tickers are errors,
/// so `check` exits non-zero for them.
async fn check(fetcher: &Fetcher, ticker: &str) -> Result<DilutionReport> {
    let lookup = fetcher.load_shares(ticker).await?;
    let report = dilution::report(Fetcher::validate(ticker)?, lookup);
    info!("{}: {} periods", report.symbol, report.series.len());
    Ok(report)
}

fn print_report(report: &DilutionReport) {
    println!("─────────────────────────────────");
    println!("  {} Dilution Check", report.symbol);
    println!("─────────────────────────────────");
    for r in report.series.records() {
        println!("  {}  {:>20}", r.period, utils::fmt_shares(r.shares_outstanding));
    }
    println!("─────────────────────────────────");
    println!("  Current shares : {}", utils::fmt_shares(report.current_shares));
    println!("  Latest change  : {}", utils::fmt_pct(report.dilution.last_pct_change));
    println!("  Dilution risk  : {}", report.dilution.rating);
    if report.series.len() == 1 {
        println!("  (historical dilution data not available)");
    }
    println!("─────────────────────────────────");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::fetcher::FetchError;
    use crate::models::ProviderSnapshot;
    use crate::provider::testing::StaticSource;
    use std::sync::Arc;
    use std::time::Duration;

    fn fetcher(source: StaticSource) -> Fetcher {
        Fetcher::new(Arc::new(source), &CacheConfig::default(), Duration::from_secs(5))
    }

    #[test]
    fn test_check_fails_for_unavailable_ticker() {
        let fetcher = fetcher(StaticSource::failing());
        let err = tokio_test::block_on(check(&fetcher, "ZZZZ")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<FetchError>(),
            Some(&FetchError::ProviderUnavailable { symbol: "ZZZZ".into() })
        );
    }

    #[test]
    fn test_check_fails_for_invalid_ticker() {
        let source = StaticSource::ok(ProviderSnapshot {
            current_shares: Some(1),
            history: None,
        });
        let err = tokio_test::block_on(check(&fetcher(source), "  ")).unwrap_err();
        assert!(matches!(err.downcast_ref::<FetchError>(), Some(FetchError::InvalidInput(_))));
    }

    #[test]
    fn test_check_reports_live_count() {
        let source = StaticSource::ok(ProviderSnapshot {
            current_shares: Some(42),
            history: None,
        });
        let report = tokio_test::block_on(check(&fetcher(source), "acme")).unwrap();
        assert_eq!(report.symbol, "ACME");
        assert_eq!(report.current_shares, Some(42));
    }
}
