//! Completed-assessment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::AnswerMap;
use crate::scoring::{FineSubtotals, ScoreSummary};

/// The single durable result of a completed session. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    /// Unique record identifier.
    pub id: Uuid,
    /// Who answered.
    pub respondent_id: String,
    /// Which assessment was taken.
    pub assessment_id: String,
    /// When the session completed.
    pub created_at: DateTime<Utc>,
    /// Every recorded answer, keyed by question id.
    pub answers: AnswerMap,
    /// Sum of all choice scores.
    pub total_score: f64,
    /// Per fine dimension sum and count.
    #[serde(default)]
    pub fine_subtotals: FineSubtotals,
}

impl AssessmentRecord {
    /// Build a record for a just-completed session.
    pub fn new(
        respondent_id: impl Into<String>,
        assessment_id: impl Into<String>,
        answers: AnswerMap,
        summary: ScoreSummary,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            respondent_id: respondent_id.into(),
            assessment_id: assessment_id.into(),
            created_at: Utc::now(),
            answers,
            total_score: summary.total_score,
            fine_subtotals: summary.fine_subtotals,
        }
    }

    /// Whether any dimension was scored, i.e. whether this record can feed
    /// a profile.
    pub fn has_dimension_data(&self) -> bool {
        !self.fine_subtotals.is_empty()
    }
}

/// Sort records newest first, the order history views expect.
pub fn sort_newest_first(records: &mut [AssessmentRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answer, QuestionOption};
    use chrono::Duration;

    fn sample() -> AssessmentRecord {
        let mut answers = AnswerMap::new();
        answers.insert(
            "q1".into(),
            Answer::Choice(QuestionOption {
                label: "A".into(),
                text: "Often".into(),
                score: Some(4.0),
                dimension: Some("optimism".into()),
            }),
        );
        answers.insert("q2".into(), Answer::FreeText { value: "football".into() });

        let mut summary = ScoreSummary::default();
        summary.total_score = 4.0;
        summary.fine_subtotals.record("optimism", 4.0);

        AssessmentRecord::new("student-1", "national-survey", answers, summary)
    }

    #[test]
    fn missing_subtotals_default_to_empty() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000000",
            "respondent_id": "s",
            "assessment_id": "logic-01",
            "created_at": "2025-01-01T00:00:00Z",
            "answers": {},
            "total_score": 7.0
        }"#;
        let record: AssessmentRecord = serde_json::from_str(json).unwrap();
        assert!(!record.has_dimension_data());
    }

    #[test]
    fn newest_first_ordering() {
        let older = sample();
        let mut newer = sample();
        newer.created_at = older.created_at + Duration::seconds(5);
        let mut records = vec![older.clone(), newer.clone()];
        sort_newest_first(&mut records);
        assert_eq!(records[0].id, newer.id);
        assert_eq!(records[1].id, older.id);
    }
}
