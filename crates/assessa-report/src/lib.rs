//! assessa-report — History dashboards.
//!
//! Renders a respondent's `HistoryView` as a self-contained HTML page with
//! an SVG radar of the macro profile and an SVG line of the score trend.

pub mod html;

pub use html::{generate_html, write_html_report};
