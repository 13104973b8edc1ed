//! Core data model types for assessa.
//!
//! These are the fundamental types the whole system uses to represent
//! questions, their options and dependency rules, and recorded answers.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, SessionError};

/// How a question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    /// Pick one of the listed options.
    Choice,
    /// Free-form text. Never scored.
    #[serde(alias = "text")]
    FreeText,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Choice => write!(f, "choice"),
            QuestionKind::FreeText => write!(f, "free-text"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "choice" | "single-choice" => Ok(QuestionKind::Choice),
            "text" | "free-text" | "free_text" => Ok(QuestionKind::FreeText),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// One selectable option of a choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Short identifier, unique within its question (e.g. "A").
    pub label: String,
    /// Display text.
    #[serde(default)]
    pub text: String,
    /// Contribution to the total score. Absent means zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Fine-grained dimension key. Absent means "general".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
}

/// A skip rule: the question is shown only when the question at
/// `target_order_index` was answered with the option labelled `trigger_value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub target_order_index: i64,
    pub trigger_value: String,
}

/// A single question definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Opaque identifier; answers are keyed by it.
    pub id: String,
    /// Presentation position, also the address used by dependency rules.
    pub order_index: i64,
    /// Choice or free text.
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// The prompt shown to the respondent.
    #[serde(default)]
    pub content: String,
    /// Options for choice questions, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<QuestionOption>,
    /// Optional skip rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<Dependency>,
}

impl Question {
    /// Look up an option by label. Matching ignores surrounding whitespace and
    /// ASCII case so typed input like " b" selects option "B".
    pub fn option(&self, label: &str) -> Option<&QuestionOption> {
        let wanted = label.trim();
        self.options
            .iter()
            .find(|o| o.label == wanted)
            .or_else(|| {
                self.options
                    .iter()
                    .find(|o| o.label.eq_ignore_ascii_case(wanted))
            })
    }

    /// Turn a respondent's response into a stored answer, according to this
    /// question's declared kind.
    pub fn resolve(&self, response: Response) -> Result<Answer, SessionError> {
        match (self.kind, response) {
            (QuestionKind::Choice, Response::Choice(label)) => self
                .option(&label)
                .cloned()
                .map(Answer::Choice)
                .ok_or_else(|| SessionError::UnknownOption {
                    question_id: self.id.clone(),
                    label,
                }),
            (QuestionKind::FreeText, Response::Text(value)) => {
                if value.trim().is_empty() {
                    Err(SessionError::EmptyText {
                        question_id: self.id.clone(),
                    })
                } else {
                    Ok(Answer::FreeText { value })
                }
            }
            (expected, response) => Err(SessionError::InvalidAnswerType {
                question_id: self.id.clone(),
                expected,
                actual: response.kind(),
            }),
        }
    }
}

/// What the respondent submitted, before it is resolved against a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Response {
    /// The label of the selected option.
    Choice(String),
    /// Free-form text.
    Text(String),
}

impl Response {
    /// Build a response of the kind `kind` expects from raw input.
    pub fn for_kind(kind: QuestionKind, raw: impl Into<String>) -> Self {
        match kind {
            QuestionKind::Choice => Response::Choice(raw.into()),
            QuestionKind::FreeText => Response::Text(raw.into()),
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            Response::Choice(_) => QuestionKind::Choice,
            Response::Text(_) => QuestionKind::FreeText,
        }
    }
}

/// A recorded answer.
///
/// Choice answers keep the whole selected option so that scoring can read
/// its score and dimension later without the question definition at hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Answer {
    Choice(QuestionOption),
    FreeText { value: String },
}

impl Answer {
    /// The selected label, for choice answers.
    pub fn label(&self) -> Option<&str> {
        match self {
            Answer::Choice(option) => Some(&option.label),
            Answer::FreeText { .. } => None,
        }
    }

    pub fn as_choice(&self) -> Option<&QuestionOption> {
        match self {
            Answer::Choice(option) => Some(option),
            Answer::FreeText { .. } => None,
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            Answer::Choice(_) => QuestionKind::Choice,
            Answer::FreeText { .. } => QuestionKind::FreeText,
        }
    }
}

/// Answers keyed by question id.
pub type AnswerMap = BTreeMap<String, Answer>;

/// The ordered, immutable sequence of questions of one assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QuestionGraph {
    questions: Vec<Question>,
}

impl QuestionGraph {
    /// Build a graph, ordering questions by `order_index`.
    ///
    /// Rejects duplicate `order_index` values and duplicate question ids,
    /// since both would make dependency addressing or answer keys ambiguous.
    pub fn new(mut questions: Vec<Question>) -> Result<Self, GraphError> {
        questions.sort_by_key(|q| q.order_index);

        for pair in questions.windows(2) {
            if pair[0].order_index == pair[1].order_index {
                return Err(GraphError::DuplicateOrderIndex {
                    order_index: pair[0].order_index,
                    first: pair[0].id.clone(),
                    second: pair[1].id.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for q in &questions {
            if !seen.insert(q.id.as_str()) {
                return Err(GraphError::DuplicateQuestionId(q.id.clone()));
            }
        }

        Ok(Self { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The question addressed by `order_index`, if any.
    pub fn by_order_index(&self, order_index: i64) -> Option<&Question> {
        self.position_of_order_index(order_index)
            .map(|i| &self.questions[i])
    }

    /// Position in the sequence of the question addressed by `order_index`.
    pub fn position_of_order_index(&self, order_index: i64) -> Option<usize> {
        self.questions
            .binary_search_by_key(&order_index, |q| q.order_index)
            .ok()
    }

    /// Position in the sequence of the question with the given id.
    pub fn position_of_id(&self, id: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.id == id)
    }
}

impl<'de> Deserialize<'de> for QuestionGraph {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let questions = Vec::<Question>::deserialize(deserializer)?;
        QuestionGraph::new(questions).map_err(serde::de::Error::custom)
    }
}

/// An assessment: metadata plus its question graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    /// Unique identifier, e.g. "national-survey".
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Catalog category, e.g. "survey".
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// The questions, ordered by `order_index`.
    #[serde(default)]
    pub questions: QuestionGraph,
}

/// Catalog entry for an assessment, without its questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    pub question_count: usize,
}

impl From<&Assessment> for AssessmentSummary {
    fn from(a: &Assessment) -> Self {
        Self {
            id: a.id.clone(),
            title: a.title.clone(),
            category: a.category.clone(),
            question_count: a.questions.len(),
        }
    }
}
