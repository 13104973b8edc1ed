//! A respondent's history: record list, radar profile, and score trend.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::{
    trend_series, MacroProfile, ProfileNormalizer, TrendPoint, DEFAULT_TREND_LIMIT,
};
use crate::record::AssessmentRecord;

/// How a history view is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryOptions {
    /// Assessment whose newest record feeds the profile when present.
    pub primary_assessment: Option<String>,
    /// Maximum number of trend points.
    pub trend_limit: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            primary_assessment: Some("national-survey".to_string()),
            trend_limit: DEFAULT_TREND_LIMIT,
        }
    }
}

/// One line of the record list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: Uuid,
    pub assessment_id: String,
    pub created_at: DateTime<Utc>,
    pub total_score: f64,
}

impl From<&AssessmentRecord> for RecordSummary {
    fn from(r: &AssessmentRecord) -> Self {
        Self {
            id: r.id,
            assessment_id: r.assessment_id.clone(),
            created_at: r.created_at,
            total_score: r.total_score,
        }
    }
}

/// Everything a dashboard shows for one respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryView {
    pub respondent_id: String,
    pub generated_at: DateTime<Utc>,
    pub record_count: usize,
    /// Total score of the newest record.
    pub latest_score: Option<f64>,
    pub profile: MacroProfile,
    /// Record the profile was computed from; `None` means the empty profile.
    pub profile_source: Option<Uuid>,
    /// Oldest to newest.
    pub trend: Vec<TrendPoint>,
    /// Newest first.
    pub records: Vec<RecordSummary>,
}

impl HistoryView {
    /// Build the view from records ordered newest first.
    pub fn build(
        respondent_id: &str,
        records: &[AssessmentRecord],
        normalizer: &ProfileNormalizer,
        options: &HistoryOptions,
    ) -> Self {
        let (profile, profile_source) =
            normalizer.profile_from_history(records, options.primary_assessment.as_deref());

        Self {
            respondent_id: respondent_id.to_string(),
            generated_at: Utc::now(),
            record_count: records.len(),
            latest_score: records.first().map(|r| r.total_score),
            profile,
            profile_source,
            trend: trend_series(records, options.trend_limit),
            records: records.iter().map(RecordSummary::from).collect(),
        }
    }

    /// Save the view as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize history")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write history to {}", path.display()))?;
        Ok(())
    }
}
