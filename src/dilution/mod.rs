//! Dilution calculator: period-over-period change in share count plus a
//! qualitative rating of the latest change.
//!
//! Pure and single pass. Missing data never raises; it surfaces as an
//! undefined change and, for the headline, as `Rating::NotApplicable`.

use crate::models::{
    normalise_records, DilutionReport, DilutionResult, PeriodChange, Rating, SharesLookup,
    SharesRecord, SharesSeries,
};

/// Headline change strictly above this is `High`.
pub const HIGH_THRESHOLD_PCT: f64 = 10.0;
/// Headline change strictly above this (and not `High`) is `Moderate`.
pub const MODERATE_THRESHOLD_PCT: f64 = 2.0;

/// Percent change from `previous` to `current`, undefined when either side is
/// missing or the base is zero.
pub fn pct_change(previous: Option<u64>, current: Option<u64>) -> Option<f64> {
    let (prev, cur) = (previous?, current?);
    if prev == 0 {
        return None;
    }
    let prev = prev as f64;
    Some((cur as f64 - prev) / prev * 100.0)
}

pub fn rate(last_pct_change: Option<f64>) -> Rating {
    match last_pct_change {
        None => Rating::NotApplicable,
        Some(p) if p > HIGH_THRESHOLD_PCT => Rating::High,
        Some(p) if p > MODERATE_THRESHOLD_PCT => Rating::Moderate,
        Some(_) => Rating::Stable,
    }
}

/// Compute over arbitrary records; sorts and de-duplicates first.
pub fn compute(records: &[SharesRecord]) -> DilutionResult {
    let records = normalise_records(records.to_vec());
    if records.len() < 2 {
        return DilutionResult::not_applicable();
    }

    let pct_change_by_period: Vec<PeriodChange> = records
        .windows(2)
        .map(|w| PeriodChange {
            period: w[1].period,
            pct_change: pct_change(w[0].shares_outstanding, w[1].shares_outstanding),
        })
        .collect();

    let last_pct_change = pct_change_by_period.last().and_then(|c| c.pct_change);

    DilutionResult {
        pct_change_by_period,
        last_pct_change,
        rating: rate(last_pct_change),
    }
}

/// Absent series → not applicable.
pub fn compute_series(series: Option<&SharesSeries>) -> DilutionResult {
    match series {
        Some(s) => compute(s.records()),
        None => DilutionResult::not_applicable(),
    }
}

/// Dilution is computed from the series alone; the live count is carried
/// through for display.
pub fn report(symbol: impl Into<String>, lookup: SharesLookup) -> DilutionReport {
    let dilution = compute_series(Some(&lookup.series));
    DilutionReport {
        symbol: symbol.into(),
        current_shares: lookup.current_shares(),
        series: lookup.series,
        dilution,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
