//! HTML dashboard generator.
//!
//! Produces a self-contained HTML file with all CSS inlined and charts drawn
//! as inline SVG.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};

use assessa_core::history::HistoryView;
use assessa_core::profile::{MacroProfile, TrendPoint};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn title_for<'a>(titles: &'a BTreeMap<String, String>, assessment_id: &'a str) -> &'a str {
    titles.get(assessment_id).map(String::as_str).unwrap_or(assessment_id)
}

/// Generate an HTML dashboard from a history view.
///
/// `titles` maps assessment ids to display titles; unknown ids are shown
/// as-is.
pub fn generate_html(view: &HistoryView, titles: &BTreeMap<String, String>) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>assessa history: {}</title>\n",
        html_escape(&view.respondent_id)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str("<h1>assessa history</h1>\n");
    let latest = view
        .latest_score
        .map(|s| format!("{s:.1}"))
        .unwrap_or_else(|| "-".to_string());
    html.push_str(&format!(
        "<p class=\"meta\">Respondent: <strong>{}</strong> | {} assessments | latest score {} | {}</p>\n",
        html_escape(&view.respondent_id),
        view.record_count,
        latest,
        view.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str("</header>\n");

    html.push_str("<section class=\"dashboard\">\n");
    html.push_str("<div class=\"chart\">\n<h2>Profile</h2>\n");
    html.push_str(&generate_radar_chart(&view.profile));
    if view.profile_source.is_none() {
        html.push_str("<p class=\"meta\">No dimension data yet.</p>\n");
    }
    html.push_str("</div>\n");

    html.push_str("<div class=\"chart\">\n<h2>Trend</h2>\n");
    if view.trend.is_empty() {
        html.push_str("<p class=\"meta\">No assessments taken yet.</p>\n");
    } else {
        html.push_str(&generate_trend_chart(&view.trend));
    }
    html.push_str("</div>\n");
    html.push_str("</section>\n");

    html.push_str("<section class=\"records\">\n");
    html.push_str("<h2>Records</h2>\n");
    html.push_str("<table>\n");
    html.push_str("<thead><tr><th>Date</th><th>Assessment</th><th>Total score</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for record in &view.records {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.1}</td></tr>\n",
            record.created_at.format("%Y-%m-%d %H:%M"),
            html_escape(title_for(titles, &record.assessment_id)),
            record.total_score
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(view).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML dashboard to a file.
pub fn write_html_report(
    view: &HistoryView,
    titles: &BTreeMap<String, String>,
    path: &Path,
) -> Result<()> {
    let html = generate_html(view, titles);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

/// Four axes at top, right, bottom and left; values are 0..=100.
fn generate_radar_chart(profile: &MacroProfile) -> String {
    const SIZE: f64 = 360.0;
    const CENTER: f64 = SIZE / 2.0;
    const RADIUS: f64 = 120.0;

    let point = |axis: usize, fraction: f64| -> (f64, f64) {
        let angle = -std::f64::consts::FRAC_PI_2 + axis as f64 * std::f64::consts::FRAC_PI_2;
        (
            CENTER + RADIUS * fraction * angle.cos(),
            CENTER + RADIUS * fraction * angle.sin(),
        )
    };
    let polygon = |fractions: &[f64]| -> String {
        fractions
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let (x, y) = point(i, *f);
                format!("{x:.1},{y:.1}")
            })
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut svg = format!(
        "<svg width=\"{SIZE}\" height=\"{SIZE}\" viewBox=\"0 0 {SIZE} {SIZE}\" xmlns=\"http://www.w3.org/2000/svg\" class=\"radar\">\n"
    );

    for ring in [0.25, 0.5, 0.75, 1.0] {
        let _ = writeln!(
            svg,
            "  <polygon points=\"{}\" fill=\"none\" stroke=\"var(--border)\"/>",
            polygon(&[ring; 4])
        );
    }

    for (i, entry) in profile.iter().enumerate() {
        let (x, y) = point(i, 1.0);
        let _ = writeln!(
            svg,
            "  <line x1=\"{CENTER}\" y1=\"{CENTER}\" x2=\"{x:.1}\" y2=\"{y:.1}\" stroke=\"var(--border)\"/>"
        );
        let (lx, ly) = point(i, 1.22);
        let _ = writeln!(
            svg,
            "  <text x=\"{lx:.1}\" y=\"{ly:.1}\" font-size=\"12\" fill=\"currentColor\" text-anchor=\"middle\" dominant-baseline=\"middle\">{} ({})</text>",
            html_escape(&entry.label),
            entry.value
        );
    }

    let values: Vec<f64> = profile.iter().map(|e| f64::from(e.value) / 100.0).collect();
    let _ = writeln!(
        svg,
        "  <polygon points=\"{}\" fill=\"#3b82f6\" fill-opacity=\"0.35\" stroke=\"#3b82f6\" stroke-width=\"2\"/>",
        polygon(&values)
    );

    svg.push_str("</svg>\n");
    svg
}

/// Polyline of total scores, oldest on the left.
fn generate_trend_chart(points: &[TrendPoint]) -> String {
    const WIDTH: f64 = 520.0;
    const HEIGHT: f64 = 240.0;
    const PADDING: f64 = 40.0;

    let max = points
        .iter()
        .map(|p| p.total_score)
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let min = points.iter().map(|p| p.total_score).fold(0.0_f64, f64::min);
    let span = max - min;

    let x_of = |i: usize| -> f64 {
        if points.len() == 1 {
            WIDTH / 2.0
        } else {
            PADDING + i as f64 * (WIDTH - 2.0 * PADDING) / (points.len() - 1) as f64
        }
    };
    let y_of =
        |score: f64| -> f64 { HEIGHT - PADDING - (score - min) / span * (HEIGHT - 2.0 * PADDING) };

    let mut svg = format!(
        "<svg width=\"{WIDTH}\" height=\"{HEIGHT}\" viewBox=\"0 0 {WIDTH} {HEIGHT}\" xmlns=\"http://www.w3.org/2000/svg\" class=\"trend\">\n"
    );
    let _ = writeln!(
        svg,
        "  <line x1=\"{PADDING}\" y1=\"{y:.1}\" x2=\"{x2}\" y2=\"{y:.1}\" stroke=\"var(--border)\"/>",
        y = HEIGHT - PADDING,
        x2 = WIDTH - PADDING
    );

    let line: Vec<String> = points
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{:.1},{:.1}", x_of(i), y_of(p.total_score)))
        .collect();
    let _ = writeln!(
        svg,
        "  <polyline points=\"{}\" fill=\"none\" stroke=\"#22c55e\" stroke-width=\"2\"/>",
        line.join(" ")
    );

    for (i, p) in points.iter().enumerate() {
        let (x, y) = (x_of(i), y_of(p.total_score));
        let _ = writeln!(
            svg,
            "  <circle cx=\"{x:.1}\" cy=\"{y:.1}\" r=\"4\" fill=\"#22c55e\"><title>{}: {:.1}</title></circle>",
            html_escape(&p.assessment_id),
            p.total_score
        );
        let _ = writeln!(
            svg,
            "  <text x=\"{x:.1}\" y=\"{:.1}\" font-size=\"11\" fill=\"currentColor\" text-anchor=\"middle\">{}</text>",
            HEIGHT - PADDING / 2.0,
            html_escape(&p.label)
        );
        let _ = writeln!(
            svg,
            "  <text x=\"{x:.1}\" y=\"{:.1}\" font-size=\"11\" fill=\"currentColor\" text-anchor=\"middle\">{:.1}</text>",
            y - 8.0,
            p.total_score
        );
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.dashboard { display: flex; flex-wrap: wrap; gap: 2rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 1rem 0; overflow: visible; }
"#;
