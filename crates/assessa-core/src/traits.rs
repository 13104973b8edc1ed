//! Storage seams: where question graphs come from and where records go.
//!
//! These async traits are implemented by the `assessa-store` crate.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Assessment, AssessmentSummary};
use crate::record::AssessmentRecord;

/// Supplies assessment definitions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Load one assessment with its full question graph.
    async fn load_assessment(&self, assessment_id: &str) -> Result<Assessment, StoreError>;

    /// List the assessments this source can load.
    async fn list_assessments(&self) -> Result<Vec<AssessmentSummary>, StoreError>;
}

/// Durable storage for completed-assessment records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Human-readable store name (e.g. "file").
    fn name(&self) -> &str;

    /// Persist a record. Writing a record with an id that already exists
    /// replaces it, so a retried save does not duplicate.
    async fn insert(&self, record: &AssessmentRecord) -> Result<(), StoreError>;

    /// All records of a respondent, newest first.
    async fn records_for(&self, respondent_id: &str) -> Result<Vec<AssessmentRecord>, StoreError>;
}
