//! Score aggregation.
//!
//! Reduces an answer map into a total score and per-dimension subtotals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Answer, AnswerMap, QuestionGraph, QuestionKind};

/// Dimension key used for options that carry no dimension.
pub const GENERAL_DIMENSION: &str = "general";

/// Running sum and answered-count for one fine dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionTally {
    pub sum: f64,
    pub count: u32,
}

impl DimensionTally {
    pub fn new(sum: f64, count: u32) -> Self {
        Self { sum, count }
    }

    /// Mean score per answered item; zero when nothing was answered.
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn add(&mut self, score: f64) {
        self.sum += score;
        self.count += 1;
    }

    pub(crate) fn merge(&mut self, other: &DimensionTally) {
        self.sum += other.sum;
        self.count += other.count;
    }
}

/// Fine dimension key → subtotal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FineSubtotals(BTreeMap<String, DimensionTally>);

impl FineSubtotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dimension: &str) -> Option<&DimensionTally> {
        self.0.get(dimension)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DimensionTally)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add one answered item scoring `score` to `dimension`.
    pub fn record(&mut self, dimension: &str, score: f64) {
        self.0.entry(dimension.to_string()).or_default().add(score);
    }
}

impl FromIterator<(String, DimensionTally)> for FineSubtotals {
    fn from_iter<I: IntoIterator<Item = (String, DimensionTally)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Total score plus fine-dimension subtotals of one answer set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total_score: f64,
    pub fine_subtotals: FineSubtotals,
}

/// Aggregate the scores of every answered choice question.
///
/// Walks the whole graph rather than only the visible path: an answer left
/// behind on a question that later became hidden still counts. Free-text
/// answers and unanswered questions contribute nothing. Options without a
/// score contribute zero but still count as answered in their dimension.
pub fn aggregate(graph: &QuestionGraph, answers: &AnswerMap) -> ScoreSummary {
    let mut summary = ScoreSummary::default();

    for question in graph.questions() {
        if question.kind != QuestionKind::Choice {
            continue;
        }
        let Some(Answer::Choice(option)) = answers.get(&question.id) else {
            continue;
        };

        let score = option.score.filter(|s| s.is_finite()).unwrap_or(0.0);
        let dimension = option
            .dimension
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(GENERAL_DIMENSION);

        summary.total_score += score;
        summary.fine_subtotals.record(dimension, score);
    }

    tracing::debug!(
        total = summary.total_score,
        dimensions = summary.fine_subtotals.len(),
        "aggregated answers"
    );

    summary
}
