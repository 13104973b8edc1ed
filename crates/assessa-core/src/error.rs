//! Error types for graph construction, sessions, and record storage.
//!
//! Store errors are defined here so the engine can classify failed saves
//! for retry decisions without string matching.

use thiserror::Error;
use uuid::Uuid;

use crate::model::QuestionKind;

/// A question sequence that cannot form a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Two questions share an `order_index`, so dependency addressing is ambiguous.
    #[error("duplicate order_index {order_index} (questions '{first}' and '{second}')")]
    DuplicateOrderIndex {
        order_index: i64,
        first: String,
        second: String,
    },

    /// Two questions share an id, so answers would overwrite each other.
    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(String),
}

/// Errors raised while a respondent moves through a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The assessment has no questions. Nothing to do.
    #[error("assessment '{assessment_id}' has no questions")]
    NoQuestions { assessment_id: String },

    /// An answer was submitted after the last question.
    #[error("session is already complete")]
    AlreadyComplete,

    /// The response kind does not match the question's declared type.
    #[error("question '{question_id}' expects a {expected} answer, got {actual}")]
    InvalidAnswerType {
        question_id: String,
        expected: QuestionKind,
        actual: QuestionKind,
    },

    /// No option with the given label exists.
    #[error("question '{question_id}' has no option '{label}'")]
    UnknownOption { question_id: String, label: String },

    /// Free-text answers must not be blank.
    #[error("question '{question_id}' requires a non-empty answer")]
    EmptyText { question_id: String },

    /// The session has questions left, so there is no record to save yet.
    #[error("session is not complete yet")]
    NotComplete,

    /// The record of this session was already persisted.
    #[error("session already saved as record {0}")]
    AlreadyCommitted(Uuid),
}

/// Errors that can occur when reading or writing the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested assessment does not exist.
    #[error("assessment not found: {0}")]
    AssessmentNotFound(String),

    /// The assessment definition exists but could not be loaded.
    #[error("invalid assessment '{id}': {reason}")]
    InvalidAssessment { id: String, reason: String },

    /// An I/O failure in the backing storage.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be encoded or decoded.
    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store is temporarily unable to serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns `true` if retrying the same operation cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            StoreError::AssessmentNotFound(_)
                | StoreError::InvalidAssessment { .. }
                | StoreError::Serialization(_)
        )
    }
}

/// Errors surfaced by [`crate::engine::AssessmentEngine`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
