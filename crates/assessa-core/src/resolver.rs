//! Branch resolution over the question graph.
//!
//! Decides whether a question is shown given the answers recorded so far,
//! and finds the next question to present. Both operations are pure
//! functions of the graph and the answer map.

use serde::{Deserialize, Serialize};

use crate::model::{Answer, AnswerMap, Question, QuestionGraph};

/// Why a question is shown or skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Visibility {
    /// The question has no dependency.
    Unconditional,
    /// The dependency target does not exist. The question is shown anyway so
    /// that a misconfigured graph cannot leave a session stuck.
    FailOpen { target_order_index: i64 },
    /// The target was answered with the trigger label.
    Triggered,
    /// The dependency is not satisfied.
    Skipped(SkipReason),
}

impl Visibility {
    pub fn is_visible(&self) -> bool {
        !matches!(self, Visibility::Skipped(_))
    }
}

/// Why a dependent question is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The target question has no answer.
    Unanswered { target_id: String },
    /// The target was answered with free text, which never matches a trigger.
    FreeTextAnswer { target_id: String },
    /// The target was answered with a different option.
    LabelMismatch { expected: String, actual: String },
}

/// Resolves visibility and navigation for one question graph.
#[derive(Debug, Clone, Copy)]
pub struct BranchResolver<'g> {
    graph: &'g QuestionGraph,
}

impl<'g> BranchResolver<'g> {
    pub fn new(graph: &'g QuestionGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g QuestionGraph {
        self.graph
    }

    /// Explain whether `question` is shown under `answers`.
    pub fn visibility(&self, question: &Question, answers: &AnswerMap) -> Visibility {
        let Some(dependency) = &question.dependency else {
            return Visibility::Unconditional;
        };

        let Some(target) = self.graph.by_order_index(dependency.target_order_index) else {
            tracing::debug!(
                question = %question.id,
                target = dependency.target_order_index,
                "dependency target missing, showing question"
            );
            return Visibility::FailOpen {
                target_order_index: dependency.target_order_index,
            };
        };

        match answers.get(&target.id) {
            None => Visibility::Skipped(SkipReason::Unanswered {
                target_id: target.id.clone(),
            }),
            Some(Answer::FreeText { .. }) => Visibility::Skipped(SkipReason::FreeTextAnswer {
                target_id: target.id.clone(),
            }),
            Some(Answer::Choice(option)) if option.label == dependency.trigger_value => {
                Visibility::Triggered
            }
            Some(Answer::Choice(option)) => Visibility::Skipped(SkipReason::LabelMismatch {
                expected: dependency.trigger_value.clone(),
                actual: option.label.clone(),
            }),
        }
    }

    /// Whether `question` is shown under `answers`.
    pub fn is_visible(&self, question: &Question, answers: &AnswerMap) -> bool {
        self.visibility(question, answers).is_visible()
    }

    /// Scan forward from `from` (inclusive) for the first visible question.
    ///
    /// Returns `None` once the scan passes the end of the graph; that is the
    /// only completion signal. At most `len - from` questions are checked, so
    /// the scan terminates for any dependency structure, cyclic ones included.
    pub fn next_visible_index(&self, from: usize, answers: &AnswerMap) -> Option<usize> {
        self.scan_from(from, |q| self.is_visible(q, answers))
    }

    /// Forward scan with the visibility predicate supplied by the caller.
    /// The predicate is called once per question from `from` to the first hit.
    fn scan_from(&self, from: usize, mut shown: impl FnMut(&Question) -> bool) -> Option<usize> {
        self.graph
            .questions()
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, q)| shown(q))
            .map(|(index, _)| index)
    }

    /// Positions of every question visible under `answers`, in order.
    ///
    /// Visibility of later questions can change as answers are added, so this
    /// is a snapshot for review screens, not a navigation plan.
    pub fn visible_indices(&self, answers: &AnswerMap) -> Vec<usize> {
        self.graph
            .questions()
            .iter()
            .enumerate()
            .filter(|(_, q)| self.is_visible(q, answers))
            .map(|(index, _)| index)
            .collect()
    }
}
