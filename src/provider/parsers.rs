//! Yahoo Finance JSON payloads → provider snapshot halves.

use crate::models::{FinancialHistory, FinancialRow};
use crate::provider::cleaner::to_share_count;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

// ── Fundamentals timeseries ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TimeseriesEnvelope {
    timeseries: TimeseriesBody,
}

#[derive(Debug, Deserialize)]
struct TimeseriesBody {
    result: Option<Vec<TimeseriesResult>>,
    error: Option<serde_json::Value>,
}

/// One line item. The points live under a key equal to `meta.type[0]`.
#[derive(Debug, Deserialize)]
struct TimeseriesResult {
    meta: TimeseriesMeta,
    #[serde(flatten)]
    fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TimeseriesMeta {
    #[serde(rename = "type", default)]
    kind: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DataPoint {
    #[serde(rename = "asOfDate")]
    as_of_date: Option<String>,
    #[serde(rename = "reportedValue")]
    reported_value: Option<ReportedValue>,
}

#[derive(Debug, Deserialize)]
struct ReportedValue {
    raw: Option<f64>,
}

/// Pivot line-item series into date-indexed rows.
pub fn parse_timeseries(json: &str) -> Result<FinancialHistory> {
    let envelope: TimeseriesEnvelope =
        serde_json::from_str(json).context("Malformed timeseries payload")?;

    if let Some(err) = envelope.timeseries.error.filter(|e| !e.is_null()) {
        bail!("Timeseries error: {}", err);
    }

    let mut rows: BTreeMap<String, FinancialRow> = BTreeMap::new();

    for result in envelope.timeseries.result.unwrap_or_default() {
        let Some(item) = result.meta.kind.first() else { continue };
        let Some(raw_points) = result.fields.get(item) else {
            debug!("{}: no points", item);
            continue;
        };

        let points: Vec<Option<DataPoint>> = match serde_json::from_value(raw_points.clone()) {
            Ok(p) => p,
            Err(e) => {
                warn!("{}: skipping malformed points: {}", item, e);
                continue;
            }
        };

        for point in points.into_iter().flatten() {
            let Some(date) = point.as_of_date else { continue };
            let value = point.reported_value.and_then(|v| v.raw);
            rows.entry(date.clone())
                .or_insert_with(|| FinancialRow {
                    period_label: date,
                    items: BTreeMap::new(),
                })
                .items
                .insert(item.clone(), value);
        }
    }

    Ok(FinancialHistory {
        rows: rows.into_values().collect(),
    })
}

// ── quoteSummary ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryBody {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<QuoteSummaryError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "defaultKeyStatistics")]
    default_key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize)]
struct KeyStatistics {
    #[serde(rename = "sharesOutstanding")]
    shares_outstanding: Option<ReportedValue>,
}

/// Current shares outstanding from a `defaultKeyStatistics` quoteSummary.
pub fn parse_quote_summary(json: &str) -> Result<Option<u64>> {
    let envelope: QuoteSummaryEnvelope =
        serde_json::from_str(json).context("Malformed quoteSummary payload")?;
    let body = envelope.quote_summary;

    if let Some(err) = body.error {
        bail!(
            "quoteSummary error: {} ({})",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        );
    }

    Ok(body
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|r| r.default_key_statistics)
        .and_then(|k| k.shares_outstanding)
        .and_then(|v| v.raw)
        .and_then(to_share_count))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
