//! Server-side SVG line chart of the percent-change series.

use crate::utils::fmt_pct;
use chrono::NaiveDate;
use std::fmt::Write;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 260.0;
const PAD_X: f64 = 56.0;
const PAD_Y: f64 = 24.0;

/// `None` when there is nothing to plot.
pub fn line_chart_svg(points: &[(NaiveDate, f64)]) -> Option<String> {
    if points.is_empty() {
        return None;
    }

    // the zero line is always in frame
    let lo = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::min);
    let hi = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let (lo, hi) = if hi - lo < f64::EPSILON { (lo - 1.0, hi + 1.0) } else { (lo, hi) };

    let x = |i: usize| -> f64 {
        if points.len() == 1 {
            WIDTH / 2.0
        } else {
            PAD_X + i as f64 * (WIDTH - 2.0 * PAD_X) / (points.len() - 1) as f64
        }
    };
    let y = |v: f64| -> f64 { PAD_Y + (hi - v) / (hi - lo) * (HEIGHT - 2.0 * PAD_Y) };

    let mut svg = String::new();
    // writes into a String cannot fail
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" class="chart" role="img" aria-label="Share count change by period">"#,
        w = WIDTH,
        h = HEIGHT
    );
    let _ = write!(
        svg,
        r##"<line x1="{x1}" y1="{y0:.1}" x2="{x2}" y2="{y0:.1}" stroke="#999" stroke-dasharray="4 3"/>"##,
        x1 = PAD_X,
        x2 = WIDTH - PAD_X,
        y0 = y(0.0)
    );
    for (label, v) in [(fmt_pct(Some(hi)), hi), (fmt_pct(Some(lo)), lo)] {
        let _ = write!(
            svg,
            r#"<text x="{tx}" y="{ty:.1}" font-size="11" text-anchor="end">{label}</text>"#,
            tx = PAD_X - 6.0,
            ty = y(v) + 4.0
        );
    }

    let path = points
        .iter()
        .enumerate()
        .map(|(i, (_, v))| format!("{:.1},{:.1}", x(i), y(*v)))
        .collect::<Vec<_>>()
        .join(" ");
    let _ = write!(
        svg,
        r##"<polyline points="{path}" fill="none" stroke="#2b6cb0" stroke-width="2"/>"##
    );

    for (i, (period, v)) in points.iter().enumerate() {
        let _ = write!(
            svg,
            r##"<circle cx="{cx:.1}" cy="{cy:.1}" r="3.5" fill="#2b6cb0"><title>{period}: {pct}</title></circle>"##,
            cx = x(i),
            cy = y(*v),
            pct = fmt_pct(Some(*v))
        );
        let _ = write!(
            svg,
            r#"<text x="{tx:.1}" y="{ty}" font-size="11" text-anchor="middle">{period}</text>"#,
            tx = x(i),
            ty = HEIGHT - 4.0
        );
    }

    svg.push_str("</svg>");
    Some(svg)
}
