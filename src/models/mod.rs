use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Shares series ─────────────────────────────────────────────────────────────

/// One observation period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SharesRecord {
    pub period: NaiveDate,
    /// `None` when the period did not report a count.
    pub shares_outstanding: Option<u64>,
}

impl SharesRecord {
    pub fn new(period: NaiveDate, shares_outstanding: Option<u64>) -> Self {
        Self { period, shares_outstanding }
    }
}

/// Records sorted ascending by period, unique periods, never empty.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(transparent)]
pub struct SharesSeries {
    records: Vec<SharesRecord>,
}

impl SharesSeries {
    /// Sort + de-duplicate. Returns `None` for an empty input.
    pub fn new(records: Vec<SharesRecord>) -> Option<Self> {
        let records = normalise_records(records);
        if records.is_empty() {
            None
        } else {
            Some(Self { records })
        }
    }

    pub fn records(&self) -> &[SharesRecord] {
        &self.records
    }

    pub fn latest(&self) -> &SharesRecord {
        // non-empty by construction
        &self.records[self.records.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// The `n` most recent records, still in ascending order.
    pub fn recent(&self, n: usize) -> &[SharesRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }
}

/// Sort ascending by period and collapse duplicate periods.
///
/// For a repeated period the later record wins, unless it would replace a
/// reported count with an absent one.
pub fn normalise_records(mut records: Vec<SharesRecord>) -> Vec<SharesRecord> {
    records.sort_by_key(|r| r.period);

    let mut out: Vec<SharesRecord> = Vec::with_capacity(records.len());
    for rec in records {
        match out.last_mut() {
            Some(prev) if prev.period == rec.period => {
                if rec.shares_outstanding.is_some() {
                    *prev = rec;
                }
            }
            _ => out.push(rec),
        }
    }
    out
}

/// Fetcher output: the series the calculator runs on, plus the provider's
/// live count when it reported one. Only the series feeds the calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct SharesLookup {
    pub series: SharesSeries,
    pub current_shares: Option<u64>,
}

impl SharesLookup {
    /// Live count, else the latest reported period.
    pub fn current_shares(&self) -> Option<u64> {
        self.current_shares.or(self.series.latest().shares_outstanding)
    }
}

// ── Dilution ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Rating {
    High,
    Moderate,
    Stable,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::High => "High",
            Rating::Moderate => "Moderate",
            Rating::Stable => "Stable",
            Rating::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodChange {
    pub period: NaiveDate,
    pub pct_change: Option<f64>,
}

/// Derived on demand, never stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DilutionResult {
    pub pct_change_by_period: Vec<PeriodChange>,
    pub last_pct_change: Option<f64>,
    pub rating: Rating,
}

impl DilutionResult {
    pub fn not_applicable() -> Self {
        Self {
            pct_change_by_period: Vec::new(),
            last_pct_change: None,
            rating: Rating::NotApplicable,
        }
    }

    /// Periods with a defined change, for charting.
    pub fn defined_points(&self) -> Vec<(NaiveDate, f64)> {
        self.pct_change_by_period
            .iter()
            .filter_map(|c| c.pct_change.map(|v| (c.period, v)))
            .collect()
    }
}

/// What a single ticker check produces for presentation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DilutionReport {
    #[serde(rename = "ticker")]
    pub symbol: String,
    pub current_shares: Option<u64>,
    pub series: SharesSeries,
    #[serde(flatten)]
    pub dilution: DilutionResult,
}

// ── Provider snapshot ─────────────────────────────────────────────────────────

/// Best-effort provider answer: either half may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderSnapshot {
    pub current_shares: Option<u64>,
    pub history: Option<FinancialHistory>,
}

impl ProviderSnapshot {
    pub fn is_empty(&self) -> bool {
        self.current_shares.is_none()
            && self.history.as_ref().map(|h| h.rows.is_empty()).unwrap_or(true)
    }
}

/// Periodic disclosures, one row per reporting date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialHistory {
    pub rows: Vec<FinancialRow>,
}

/// Raw row: unparsed period label → named line items as the provider spells them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialRow {
    pub period_label: String,
    pub items: BTreeMap<String, Option<f64>>,
}
