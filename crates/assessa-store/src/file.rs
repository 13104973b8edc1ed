//! Filesystem-backed storage.
//!
//! Records are pretty JSON, one file per record, under
//! `<root>/<respondent>/<timestamp>-<record-id>.json`. Assessment
//! definitions are TOML files in a questions directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::instrument;

use assessa_core::error::StoreError;
use assessa_core::model::{Assessment, AssessmentSummary};
use assessa_core::parser::{load_assessment_directory, parse_assessment_str};
use assessa_core::record::{sort_newest_first, AssessmentRecord};
use assessa_core::traits::{QuestionSource, RecordStore};

/// Replace anything that is not safe in a single path component.
fn safe_component(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.chars().all(|c| c == '.') {
        "_".repeat(cleaned.len().max(1))
    } else {
        cleaned
    }
}

/// Stores each record as its own JSON file.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn respondent_dir(&self, respondent_id: &str) -> PathBuf {
        self.root.join(safe_component(respondent_id))
    }

    /// Where a record lives. Depends only on the record's own fields, so
    /// saving the same record twice overwrites one file.
    pub fn record_path(&self, record: &AssessmentRecord) -> PathBuf {
        self.respondent_dir(&record.respondent_id).join(format!(
            "{}-{}.json",
            record.created_at.format("%Y%m%dT%H%M%S%3fZ"),
            record.id
        ))
    }
}

async fn read_record(path: PathBuf) -> Result<Option<AssessmentRecord>, StoreError> {
    let content = tokio::fs::read_to_string(&path).await?;
    match serde_json::from_str::<AssessmentRecord>(&content) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            tracing::warn!("skipping unreadable record {}: {e}", path.display());
            Ok(None)
        }
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip(self, record), fields(record = %record.id))]
    async fn insert(&self, record: &AssessmentRecord) -> Result<(), StoreError> {
        let path = self.record_path(record);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), "record written");
        Ok(())
    }

    async fn records_for(&self, respondent_id: &str) -> Result<Vec<AssessmentRecord>, StoreError> {
        let dir = self.respondent_dir(respondent_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }

        let loaded = try_join_all(paths.into_iter().map(read_record)).await?;
        let mut records: Vec<AssessmentRecord> = loaded
            .into_iter()
            .flatten()
            .filter(|r| r.respondent_id == respondent_id)
            .collect();
        sort_newest_first(&mut records);

        tracing::debug!(respondent = respondent_id, count = records.len(), "records loaded");
        Ok(records)
    }
}

/// Loads assessments from a directory of TOML files.
///
/// `load_assessment("logic-01")` reads `logic-01.toml` when it exists and
/// otherwise scans the directory for a file whose header carries that id.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load_all(&self) -> Result<Vec<Assessment>, StoreError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || load_assessment_directory(&dir))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .map_err(|e| StoreError::Unavailable(format!("{e:#}")))
    }
}

#[async_trait]
impl QuestionSource for DirectorySource {
    async fn load_assessment(&self, assessment_id: &str) -> Result<Assessment, StoreError> {
        if safe_component(assessment_id) == assessment_id {
            let path = self.dir.join(format!("{assessment_id}.toml"));
            if path.is_file() {
                let content = tokio::fs::read_to_string(&path).await?;
                let assessment = parse_assessment_str(&content, &path).map_err(|e| {
                    StoreError::InvalidAssessment {
                        id: assessment_id.to_string(),
                        reason: format!("{e:#}"),
                    }
                })?;
                if assessment.id != assessment_id {
                    tracing::warn!(
                        "{} declares id '{}', expected '{assessment_id}'",
                        path.display(),
                        assessment.id
                    );
                }
                tracing::debug!(
                    assessment = assessment_id,
                    questions = assessment.questions.len(),
                    "assessment loaded"
                );
                return Ok(assessment);
            }
        }

        self.load_all()
            .await?
            .into_iter()
            .find(|a| a.id == assessment_id)
            .ok_or_else(|| StoreError::AssessmentNotFound(assessment_id.to_string()))
    }

    async fn list_assessments(&self) -> Result<Vec<AssessmentSummary>, StoreError> {
        let mut summaries: Vec<AssessmentSummary> =
            self.load_all().await?.iter().map(AssessmentSummary::from).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }
}
