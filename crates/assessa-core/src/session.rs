//! In-memory session state for one respondent taking one assessment.
//!
//! Sessions are not persisted: abandoning one (or restarting the process)
//! loses its progress, and only the record written on completion is durable.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::SessionError;
use crate::model::{AnswerMap, Question, QuestionGraph, Response};
use crate::record::AssessmentRecord;
use crate::resolver::BranchResolver;
use crate::scoring::{aggregate, ScoreSummary};

/// Where a session stands.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Waiting for an answer to the question at `index`.
    Presenting { index: usize },
    /// Every visible question is answered; the record awaits saving.
    Completed { record: AssessmentRecord },
    /// The record was saved.
    Committed { record_id: Uuid },
}

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Present the question at `index` next.
    Next { index: usize },
    /// No visible questions remain.
    Completed(ScoreSummary),
}

/// One respondent's pass through one assessment.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    assessment_id: String,
    respondent_id: String,
    started_at: DateTime<Utc>,
    graph: Arc<QuestionGraph>,
    answers: AnswerMap,
    state: SessionState,
}

impl Session {
    /// Start a session at the first visible question.
    ///
    /// An empty graph is reported as [`SessionError::NoQuestions`] rather
    /// than as an immediately completed session.
    pub fn start(
        assessment_id: impl Into<String>,
        respondent_id: impl Into<String>,
        graph: Arc<QuestionGraph>,
    ) -> Result<Self, SessionError> {
        let assessment_id = assessment_id.into();
        if graph.is_empty() {
            return Err(SessionError::NoQuestions { assessment_id });
        }

        let mut session = Self {
            id: Uuid::new_v4(),
            assessment_id,
            respondent_id: respondent_id.into(),
            started_at: Utc::now(),
            graph,
            answers: AnswerMap::new(),
            state: SessionState::Presenting { index: 0 },
        };
        session.advance_from(0);

        tracing::info!(
            session = %session.id,
            assessment = %session.assessment_id,
            questions = session.graph.len(),
            "session started"
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn assessment_id(&self) -> &str {
        &self.assessment_id
    }

    pub fn respondent_id(&self) -> &str {
        &self.respondent_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn graph(&self) -> &QuestionGraph {
        &self.graph
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Index of the question being presented.
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            SessionState::Presenting { index } => Some(index),
            _ => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().and_then(|i| self.graph.get(i))
    }

    /// No questions remain (whether or not the record is saved).
    pub fn is_complete(&self) -> bool {
        !matches!(self.state, SessionState::Presenting { .. })
    }

    /// The record awaiting a save, once complete.
    pub fn pending_record(&self) -> Option<&AssessmentRecord> {
        match &self.state {
            SessionState::Completed { record } => Some(record),
            _ => None,
        }
    }

    /// `(position, total)` for a progress display, with a 1-based position.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.graph.len();
        match self.state {
            SessionState::Presenting { index } => (index + 1, total),
            _ => (total, total),
        }
    }

    /// Scores of the answers so far. Useful for reviewing a partial session.
    pub fn score(&self) -> ScoreSummary {
        aggregate(&self.graph, &self.answers)
    }

    /// Record an answer to the current question and move on.
    ///
    /// An invalid response leaves the session untouched.
    pub fn submit(&mut self, response: Response) -> Result<Step, SessionError> {
        let SessionState::Presenting { index } = self.state else {
            return Err(SessionError::AlreadyComplete);
        };
        let question = &self.graph.questions()[index];
        let answer = question.resolve(response)?;

        tracing::debug!(session = %self.id, question = %question.id, "answer recorded");
        self.answers.insert(question.id.clone(), answer);

        Ok(self.advance_from(index + 1))
    }

    /// Submit raw input, interpreted according to the current question's type.
    pub fn submit_raw(&mut self, raw: &str) -> Result<Step, SessionError> {
        let kind = self
            .current_question()
            .map(|q| q.kind)
            .ok_or(SessionError::AlreadyComplete)?;
        self.submit(Response::for_kind(kind, raw))
    }

    fn advance_from(&mut self, from: usize) -> Step {
        let resolver = BranchResolver::new(&self.graph);
        match resolver.next_visible_index(from, &self.answers) {
            Some(index) => {
                self.state = SessionState::Presenting { index };
                Step::Next { index }
            }
            None => {
                let summary = aggregate(&self.graph, &self.answers);
                let record = AssessmentRecord::new(
                    self.respondent_id.clone(),
                    self.assessment_id.clone(),
                    self.answers.clone(),
                    summary.clone(),
                );
                tracing::info!(
                    session = %self.id,
                    record = %record.id,
                    total = summary.total_score,
                    "session complete"
                );
                self.state = SessionState::Completed { record };
                Step::Completed(summary)
            }
        }
    }

    pub(crate) fn mark_committed(&mut self, record_id: Uuid) {
        self.state = SessionState::Committed { record_id };
    }
}

/// Drive a fresh session with responses keyed by question id.
///
/// Stops at the first visible question without a response, so the returned
/// session may still be presenting. Deterministic for a given graph and
/// response map.
pub fn replay(
    assessment_id: &str,
    respondent_id: &str,
    graph: Arc<QuestionGraph>,
    responses: &BTreeMap<String, String>,
) -> Result<Session, SessionError> {
    let mut session = Session::start(assessment_id, respondent_id, graph)?;
    while let Some(question) = session.current_question() {
        let Some(raw) = responses.get(&question.id) else {
            break;
        };
        let raw = raw.clone();
        session.submit_raw(&raw)?;
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependency, QuestionKind, QuestionOption};

    fn option(label: &str, score: f64, dimension: Option<&str>) -> QuestionOption {
        QuestionOption {
            label: label.into(),
            text: label.into(),
            score: Some(score),
            dimension: dimension.map(Into::into),
        }
    }

    /// Q1 (A → x/3, B → 1); Q2 shown when Q1 = "B"; Q3 free text.
    fn graph() -> Arc<QuestionGraph> {
        Arc::new(
            QuestionGraph::new(vec![
                Question {
                    id: "q1".into(),
                    order_index: 1,
                    kind: QuestionKind::Choice,
                    content: "Pick one".into(),
                    options: vec![option("A", 3.0, Some("x")), option("B", 1.0, None)],
                    dependency: None,
                },
                Question {
                    id: "q2".into(),
                    order_index: 2,
                    kind: QuestionKind::Choice,
                    content: "Why B?".into(),
                    options: vec![option("A", 2.0, Some("y")), option("B", 0.0, Some("y"))],
                    dependency: Some(Dependency {
                        target_order_index: 1,
                        trigger_value: "B".into(),
                    }),
                },
                Question {
                    id: "q3".into(),
                    order_index: 3,
                    kind: QuestionKind::FreeText,
                    content: "Anything else?".into(),
                    options: vec![],
                    dependency: None,
                },
            ])
            .unwrap(),
        )
    }

    #[test]
    fn answer_a_skips_to_text_question() {
        let mut session = Session::start("demo", "s1", graph()).unwrap();
        assert_eq!(session.current_index(), Some(0));

        assert_eq!(
            session.submit(Response::Choice("A".into())).unwrap(),
            Step::Next { index: 2 }
        );
        let step = session.submit(Response::Text("no".into())).unwrap();

        let Step::Completed(summary) = step else {
            panic!("expected completion, got {step:?}");
        };
        assert_eq!(summary.total_score, 3.0);
        assert!(session.is_complete());
        let record = session.pending_record().unwrap();
        assert_eq!(record.total_score, 3.0);
        assert_eq!(record.answers.len(), 2);
    }

    #[test]
    fn answer_b_shows_follow_up() {
        let mut session = Session::start("demo", "s1", graph()).unwrap();
        assert_eq!(session.submit_raw("b").unwrap(), Step::Next { index: 1 });
        assert_eq!(session.current_question().unwrap().id, "q2");
        assert_eq!(session.progress(), (2, 3));
    }

    #[test]
    fn invalid_response_leaves_session_untouched() {
        let mut session = Session::start("demo", "s1", graph()).unwrap();
        assert!(matches!(
            session.submit_raw("Z"),
            Err(SessionError::UnknownOption { .. })
        ));
        assert!(matches!(
            session.submit(Response::Text("A".into())),
            Err(SessionError::InvalidAnswerType { .. })
        ));
        assert_eq!(session.current_index(), Some(0));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn blank_text_is_rejected() {
        let mut session = Session::start("demo", "s1", graph()).unwrap();
        session.submit_raw("A").unwrap();
        assert!(matches!(session.submit_raw("  "), Err(SessionError::EmptyText { .. })));
        assert_eq!(session.current_index(), Some(2));
    }

    #[test]
    fn submitting_after_completion_fails() {
        let mut session = Session::start("demo", "s1", graph()).unwrap();
        session.submit_raw("A").unwrap();
        session.submit_raw("done").unwrap();
        assert_eq!(session.submit_raw("A"), Err(SessionError::AlreadyComplete));
        assert_eq!(session.progress(), (3, 3));
    }

    #[test]
    fn empty_graph_is_nothing_to_do() {
        let err = Session::start("empty", "s1", Arc::new(QuestionGraph::default())).unwrap_err();
        assert_eq!(
            err,
            SessionError::NoQuestions {
                assessment_id: "empty".into()
            }
        );
    }

    #[test]
    fn all_hidden_questions_complete_immediately() {
        let graph = QuestionGraph::new(vec![Question {
            id: "only".into(),
            order_index: 1,
            kind: QuestionKind::Choice,
            content: String::new(),
            options: vec![option("A", 1.0, None)],
            dependency: Some(Dependency {
                target_order_index: 1,
                trigger_value: "A".into(),
            }),
        }])
        .unwrap();
        let session = Session::start("self-ref", "s1", Arc::new(graph)).unwrap();
        assert!(session.is_complete());
        assert_eq!(session.pending_record().unwrap().total_score, 0.0);
    }

    #[test]
    fn replay_is_deterministic_and_stops_at_gaps() {
        let mut responses = BTreeMap::new();
        responses.insert("q1".to_string(), "B".to_string());
        responses.insert("q2".to_string(), "A".to_string());
        responses.insert("q3".to_string(), "thanks".to_string());

        let first = replay("demo", "s1", graph(), &responses).unwrap();
        let second = replay("demo", "s1", graph(), &responses).unwrap();
        assert!(first.is_complete());
        assert_eq!(first.answers(), second.answers());
        assert_eq!(first.score().total_score, 3.0);

        responses.remove("q2");
        let partial = replay("demo", "s1", graph(), &responses).unwrap();
        assert_eq!(partial.current_index(), Some(1));
        assert_eq!(partial.score().total_score, 1.0);
    }
}
