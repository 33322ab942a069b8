use crate::models::{FinancialHistory, SharesRecord};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Normalised line-item names that carry a share count, most preferred first.
pub const SHARE_COUNT_ITEMS: [&str; 5] = [
    "ordinarysharesnumber",
    "shareissued",
    "sharesoutstanding",
    "basicaverageshares",
    "dilutedaverageshares",
];

const FREQUENCY_PREFIXES: [&str; 3] = ["annual", "quarterly", "trailing"];

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Parse period labels: ISO first, then the usual statement-header spellings.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%b %d, %Y") {
        return Some(d);
    }
    // US month-first before day-first
    if let Ok(d) = NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%d %b %Y") {
        return Some(d);
    }

    None
}

/// Provider floats → share count. Negative, NaN and infinite become absent.
pub fn to_share_count(v: f64) -> Option<u64> {
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    Some(v.round() as u64)
}

pub fn normalise_symbol(s: &str) -> String {
    s.trim().to_uppercase()
}

/// 1–15 chars of letters, digits, `.`, `-`, `^`, `=`.
pub fn is_plausible_symbol(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 15
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
}

/// "annualOrdinarySharesNumber" | "Ordinary Shares Number" | "ordinary_shares_number"
/// → "ordinarysharesnumber"
pub fn normalise_label(s: &str) -> String {
    let flat: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    for prefix in FREQUENCY_PREFIXES {
        if let Some(rest) = flat.strip_prefix(prefix) {
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    flat
}

// ── FinancialHistory → SharesRecord ──────────────────────────────────────────

/// Pick the preferred share-count column present anywhere in `history`.
/// Returns the column's original label.
pub fn share_count_column(history: &FinancialHistory) -> Option<String> {
    SHARE_COUNT_ITEMS.iter().find_map(|wanted| {
        history
            .rows
            .iter()
            .flat_map(|row| row.items.keys())
            .find(|label| normalise_label(label) == *wanted)
            .cloned()
    })
}

/// One record per parseable period, using the preferred share-count column.
/// Rows lacking the column yield an explicit absent count.
pub fn history_to_records(history: &FinancialHistory) -> Vec<SharesRecord> {
    let Some(column) = share_count_column(history) else {
        debug!("No share-count line item among {} rows", history.rows.len());
        return vec![];
    };

    history
        .rows
        .iter()
        .filter_map(|row| {
            let Some(period) = parse_date(&row.period_label) else {
                warn!("Unparseable period label {:?}", row.period_label);
                return None;
            };
            let shares = row
                .items
                .get(&column)
                .copied()
                .flatten()
                .and_then(to_share_count);
            Some(SharesRecord::new(period, shares))
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FinancialRow;
    use std::collections::BTreeMap;

    fn row(label: &str, items: &[(&str, Option<f64>)]) -> FinancialRow {
        FinancialRow {
            period_label: label.to_string(),
            items: items
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_normalise_label() {
        assert_eq!(normalise_label("annualOrdinarySharesNumber"), "ordinarysharesnumber");
        assert_eq!(normalise_label("Ordinary Shares Number"), "ordinarysharesnumber");
        assert_eq!(normalise_label("ordinary_shares_number"), "ordinarysharesnumber");
        assert_eq!(normalise_label("quarterlyShareIssued"), "shareissued");
        assert_eq!(normalise_label("trailingBasicAverageShares"), "basicaverageshares");
        assert_eq!(normalise_label("Annual"), "annual");
    }

    #[test]
    fn test_parse_date_formats() {
        let want = NaiveDate::from_ymd_opt(2023, 9, 30);
        assert_eq!(parse_date("2023-09-30"), want);
        assert_eq!(parse_date("Sep 30, 2023"), want);
        assert_eq!(parse_date(" 30 Sep 2023 "), want);
        assert_eq!(parse_date("9/30/2023"), want);
        assert_eq!(parse_date("FY2023"), None);
    }

    #[test]
    fn test_ambiguous_slash_date_is_month_first() {
        assert_eq!(parse_date("03/04/2023"), NaiveDate::from_ymd_opt(2023, 3, 4));
        // day-first still accepted when month-first cannot apply
        assert_eq!(parse_date("30/09/2023"), NaiveDate::from_ymd_opt(2023, 9, 30));
    }

    #[test]
    fn test_symbol_rules() {
        assert_eq!(normalise_symbol("  aapl "), "AAPL");
        assert!(is_plausible_symbol("BRK-B"));
        assert!(is_plausible_symbol("^GSPC"));
        assert!(is_plausible_symbol("EURUSD=X"));
        assert!(!is_plausible_symbol(""));
        assert!(!is_plausible_symbol("AA PL"));
        assert!(!is_plausible_symbol("<script>"));
        assert!(!is_plausible_symbol("ABCDEFGHIJKLMNOP"));
    }

    #[test]
    fn test_to_share_count() {
        assert_eq!(to_share_count(15_550_061_000.0), Some(15_550_061_000));
        assert_eq!(to_share_count(-1.0), None);
        assert_eq!(to_share_count(f64::NAN), None);
    }

    #[test]
    fn test_column_preference() {
        let history = FinancialHistory {
            rows: vec![
                row("2022-12-31", &[("annualBasicAverageShares", Some(90.0))]),
                row("2023-12-31", &[
                    ("annualBasicAverageShares", Some(95.0)),
                    ("Share Issued", Some(110.0)),
                ]),
            ],
        };
        assert_eq!(share_count_column(&history).as_deref(), Some("Share Issued"));

        let records = history_to_records(&history);
        assert_eq!(records.len(), 2);
        // row without the chosen column is explicitly absent, not zero
        assert_eq!(records[0].shares_outstanding, None);
        assert_eq!(records[1].shares_outstanding, Some(110));
    }

    #[test]
    fn test_history_without_share_items() {
        let history = FinancialHistory {
            rows: vec![row("2023-12-31", &[("TotalRevenue", Some(1e9))])],
        };
        assert!(history_to_records(&history).is_empty());
    }

    #[test]
    fn test_bad_period_rows_dropped() {
        let history = FinancialHistory {
            rows: vec![
                row("ttm", &[("ordinarySharesNumber", Some(1.0))]),
                row("2023-12-31", &[("ordinarySharesNumber", Some(2.0))]),
            ],
        };
        let records = history_to_records(&history);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].shares_outstanding, Some(2));
    }
}
