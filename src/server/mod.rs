//! Web presenter: ticker form, result page, JSON endpoint.

pub mod chart;

use crate::config::AppConfig;
use crate::dilution;
use crate::fetcher::{FetchError, Fetcher, UNAVAILABLE_MESSAGE};
use crate::models::{DilutionReport, Rating};
use crate::provider::cleaner::normalise_symbol;
use crate::utils::{fmt_pct, fmt_shares};
use actix_web::http::header::ContentType;
use actix_web::middleware::Logger;
use actix_web::{get, web, App, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tera::Tera;
use tracing::{error, info};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

pub struct AppState {
    fetcher: Fetcher,
    tera: Tera,
    display_rows: usize,
}

impl AppState {
    pub fn new(fetcher: Fetcher, display_rows: usize) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template("index.html", INDEX_TEMPLATE)
            .context("Failed to compile page template")?;
        Ok(Self {
            fetcher,
            tera,
            display_rows,
        })
    }

    fn render_page(&self, view: &PageView) -> HttpResponse {
        let rendered = tera::Context::from_serialize(view)
            .and_then(|ctx| self.tera.render("index.html", &ctx));

        match rendered {
            Ok(html) => HttpResponse::Ok().content_type(ContentType::html()).body(html),
            Err(e) => {
                error!("Template render failed: {:?}", e);
                HttpResponse::InternalServerError().body("Template error")
            }
        }
    }
}

// ── View models ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize)]
struct PageView {
    ticker: String,
    error: Option<String>,
    report: Option<ReportView>,
}

#[derive(Debug, Serialize)]
struct ReportView {
    symbol: String,
    current_shares: String,
    headline: String,
    rating: String,
    rating_class: &'static str,
    single_record: bool,
    rows: Vec<RowView>,
    chart_svg: Option<String>,
}

#[derive(Debug, Serialize)]
struct RowView {
    period: String,
    shares: String,
    pct_change: String,
}

impl ReportView {
    /// Table shows the `display_rows` most recent periods, newest first.
    fn build(report: &DilutionReport, display_rows: usize) -> Self {
        let changes: HashMap<_, _> = report
            .dilution
            .pct_change_by_period
            .iter()
            .map(|c| (c.period, c.pct_change))
            .collect();

        let rows = report
            .series
            .recent(display_rows)
            .iter()
            .rev()
            .map(|r| RowView {
                period: r.period.to_string(),
                shares: fmt_shares(r.shares_outstanding),
                pct_change: match changes.get(&r.period) {
                    Some(p) => fmt_pct(*p),
                    // first period has no predecessor
                    None => "—".to_string(),
                },
            })
            .collect();

        Self {
            symbol: report.symbol.clone(),
            current_shares: fmt_shares(report.current_shares),
            headline: fmt_pct(report.dilution.last_pct_change),
            rating: report.dilution.rating.to_string(),
            rating_class: match report.dilution.rating {
                Rating::High => "high",
                Rating::Moderate => "moderate",
                Rating::Stable => "stable",
                Rating::NotApplicable => "na",
            },
            single_record: report.series.len() == 1,
            rows,
            chart_svg: chart::line_chart_svg(&report.dilution.defined_points()),
        }
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    #[serde(default)]
    ticker: Option<String>,
}

#[get("/")]
async fn index(query: web::Query<CheckQuery>, state: web::Data<AppState>) -> HttpResponse {
    let raw = query.into_inner().ticker.unwrap_or_default();
    let mut view = PageView {
        ticker: normalise_symbol(&raw),
        ..Default::default()
    };

    // empty submission: just the form
    if !view.ticker.is_empty() {
        match state.fetcher.load_shares(&raw).await {
            Ok(lookup) => {
                let report = dilution::report(view.ticker.clone(), lookup);
                info!(
                    "{}: {} ({})",
                    report.symbol,
                    report.dilution.rating,
                    fmt_pct(report.dilution.last_pct_change)
                );
                view.report = Some(ReportView::build(&report, state.display_rows));
            }
            Err(e) => view.error = Some(e.to_string()),
        }
    }

    state.render_page(&view)
}

#[get("/api/dilution/{ticker}")]
async fn dilution_json(path: web::Path<String>, state: web::Data<AppState>) -> HttpResponse {
    let ticker = path.into_inner();

    match state.fetcher.load_shares(&ticker).await {
        Ok(lookup) => {
            HttpResponse::Ok().json(dilution::report(normalise_symbol(&ticker), lookup))
        }
        Err(e @ FetchError::InvalidInput(_)) => {
            HttpResponse::BadRequest().json(json!({ "error": e.to_string() }))
        }
        Err(FetchError::ProviderUnavailable { symbol }) => {
            HttpResponse::NotFound()
                .json(json!({ "ticker": symbol, "error": UNAVAILABLE_MESSAGE }))
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(dilution_json);
}

// ── Server ────────────────────────────────────────────────────────────────────

pub async fn run(config: &AppConfig) -> Result<()> {
    let fetcher = Fetcher::from_config(config)?;
    let state = web::Data::new(AppState::new(fetcher, config.server.display_rows)?);

    let addr = (config.server.host.clone(), config.server.port);
    info!("Listening on http://{}:{}", addr.0, addr.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(addr.clone())
    .with_context(|| format!("Could not bind {}:{}", addr.0, addr.1))?
    .run()
    .await
    .context("Server error")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
