use std::time::Instant;
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

/// Format a share count with thousands separators.
pub fn fmt_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

/// "—" for an absent count.
pub fn fmt_shares(n: Option<u64>) -> String {
    n.map(fmt_number).unwrap_or_else(|| "—".into())
}

/// Signed, two decimals: `+10.00%`, `-3.50%`, or `N/A`.
pub fn fmt_pct(p: Option<f64>) -> String {
    match p {
        Some(p) => format!("{:+.2}%", p),
        None => "N/A".to_string(),
    }
}
