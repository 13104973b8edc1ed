//! Assessment engine orchestrator.
//!
//! Loads question graphs, starts sessions, commits completed sessions to the
//! record store with retries, and builds history views.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, SessionError, StoreError};
use crate::history::{HistoryOptions, HistoryView};
use crate::model::Assessment;
use crate::profile::ProfileNormalizer;
use crate::record::{sort_newest_first, AssessmentRecord};
use crate::session::{Session, SessionState};
use crate::traits::{QuestionSource, RecordStore};

/// Configuration for the assessment engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retries of a failed record save before giving up.
    pub save_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_delay: Duration,
    /// How history views are assembled.
    pub history: HistoryOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_retries: 2,
            retry_delay: Duration::from_millis(250),
            history: HistoryOptions::default(),
        }
    }
}

/// The central assessment engine.
pub struct AssessmentEngine {
    source: Arc<dyn QuestionSource>,
    store: Arc<dyn RecordStore>,
    normalizer: ProfileNormalizer,
    config: EngineConfig,
}

impl AssessmentEngine {
    pub fn new(
        source: Arc<dyn QuestionSource>,
        store: Arc<dyn RecordStore>,
        normalizer: ProfileNormalizer,
        config: EngineConfig,
    ) -> Self {
        Self {
            source,
            store,
            normalizer,
            config,
        }
    }

    pub fn normalizer(&self) -> &ProfileNormalizer {
        &self.normalizer
    }

    /// Load an assessment definition.
    pub async fn assessment(&self, assessment_id: &str) -> Result<Assessment, EngineError> {
        Ok(self.source.load_assessment(assessment_id).await?)
    }

    /// Load an assessment and start a session on it.
    pub async fn start(
        &self,
        assessment_id: &str,
        respondent_id: &str,
    ) -> Result<(Assessment, Session), EngineError> {
        let assessment = self.assessment(assessment_id).await?;
        let graph = Arc::new(assessment.questions.clone());
        let session = Session::start(&assessment.id, respondent_id, graph)?;
        Ok((assessment, session))
    }

    /// Persist the record of a completed session.
    ///
    /// Transient store failures are retried with exponential backoff. When
    /// every attempt fails the error is returned and the session stays
    /// completed, so the caller can commit again without re-answering. The
    /// same record (same id) is written on every attempt.
    pub async fn commit(&self, session: &mut Session) -> Result<AssessmentRecord, EngineError> {
        let record = match session.state() {
            SessionState::Presenting { .. } => return Err(SessionError::NotComplete.into()),
            SessionState::Committed { record_id } => {
                return Err(SessionError::AlreadyCommitted(*record_id).into())
            }
            SessionState::Completed { record } => record.clone(),
        };

        let mut last_error: Option<StoreError> = None;
        let mut retry_delay = self.config.retry_delay;
        for attempt in 0..=self.config.save_retries {
            if attempt > 0 {
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(Duration::from_secs(30));
            }
            match self.store.insert(&record).await {
                Ok(()) => {
                    tracing::info!(
                        record = %record.id,
                        store = self.store.name(),
                        respondent = %record.respondent_id,
                        "record saved"
                    );
                    session.mark_committed(record.id);
                    return Ok(record);
                }
                Err(e) if e.is_permanent() => {
                    tracing::error!(record = %record.id, "record save failed permanently: {e}");
                    return Err(e.into());
                }
                Err(e) => {
                    tracing::warn!(record = %record.id, attempt, "record save failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| StoreError::Unavailable("no save attempted".into()))
            .into())
    }

    /// Load a respondent's records and build the history view.
    pub async fn history(&self, respondent_id: &str) -> Result<HistoryView, EngineError> {
        let mut records = self.store.records_for(respondent_id).await?;
        sort_newest_first(&mut records);
        tracing::debug!(respondent = respondent_id, records = records.len(), "history loaded");
        Ok(HistoryView::build(
            respondent_id,
            &records,
            &self.normalizer,
            &self.config.history,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::model::{AssessmentSummary, Question, QuestionGraph, QuestionKind, QuestionOption};
    use crate::profile::MacroCategory;

    struct StaticSource(HashMap<String, Assessment>);

    #[async_trait]
    impl QuestionSource for StaticSource {
        async fn load_assessment(&self, id: &str) -> Result<Assessment, StoreError> {
            self.0
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::AssessmentNotFound(id.to_string()))
        }

        async fn list_assessments(&self) -> Result<Vec<AssessmentSummary>, StoreError> {
            Ok(self.0.values().map(AssessmentSummary::from).collect())
        }
    }

    /// Fails the first `failures` inserts with a transient error.
    struct FlakyStore {
        failures: AtomicU32,
        records: Mutex<Vec<AssessmentRecord>>,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                records: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RecordStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn insert(&self, record: &AssessmentRecord) -> Result<(), StoreError> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StoreError::Unavailable("disk busy".into()));
            }
            let mut records = self.records.lock().unwrap();
            records.retain(|r| r.id != record.id);
            records.push(record.clone());
            Ok(())
        }

        async fn records_for(&self, respondent: &str) -> Result<Vec<AssessmentRecord>, StoreError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.respondent_id == respondent)
                .cloned()
                .collect())
        }
    }

    fn source() -> Arc<StaticSource> {
        let question = Question {
            id: "q1".into(),
            order_index: 1,
            kind: QuestionKind::Choice,
            content: "How optimistic are you?".into(),
            options: vec![QuestionOption {
                label: "A".into(),
                text: "Very".into(),
                score: Some(4.0),
                dimension: Some("optimism".into()),
            }],
            dependency: None,
        };
        let mut map = HashMap::new();
        map.insert(
            "national-survey".to_string(),
            Assessment {
                id: "national-survey".into(),
                title: "Survey".into(),
                category: "survey".into(),
                description: String::new(),
                questions: QuestionGraph::new(vec![question]).unwrap(),
            },
        );
        map.insert(
            "empty".to_string(),
            Assessment {
                id: "empty".into(),
                title: "Empty".into(),
                category: String::new(),
                description: String::new(),
                questions: QuestionGraph::default(),
            },
        );
        Arc::new(StaticSource(map))
    }

    fn engine(store: Arc<FlakyStore>, retries: u32) -> AssessmentEngine {
        AssessmentEngine::new(
            source(),
            store,
            ProfileNormalizer::default(),
            EngineConfig {
                save_retries: retries,
                retry_delay: Duration::from_millis(1),
                history: HistoryOptions::default(),
            },
        )
    }

    #[tokio::test]
    async fn full_session_is_committed_once() {
        let store = Arc::new(FlakyStore::new(0));
        let engine = engine(store.clone(), 0);

        let (_, mut session) = engine.start("national-survey", "s1").await.unwrap();
        assert!(matches!(
            engine.commit(&mut session).await,
            Err(EngineError::Session(SessionError::NotComplete))
        ));

        session.submit_raw("A").unwrap();
        let record = engine.commit(&mut session).await.unwrap();
        assert_eq!(record.total_score, 4.0);
        assert!(matches!(
            engine.commit(&mut session).await,
            Err(EngineError::Session(SessionError::AlreadyCommitted(id))) if id == record.id
        ));

        let view = engine.history("s1").await.unwrap();
        assert_eq!(view.record_count, 1);
        assert_eq!(view.profile.get(MacroCategory::SocialEmotional), 80);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let store = Arc::new(FlakyStore::new(2));
        let engine = engine(store.clone(), 2);

        let (_, mut session) = engine.start("national-survey", "s1").await.unwrap();
        session.submit_raw("A").unwrap();
        engine.commit(&mut session).await.unwrap();
        assert_eq!(store.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_save_can_be_retried_without_reanswering() {
        let store = Arc::new(FlakyStore::new(1));
        let engine = engine(store.clone(), 0);

        let (_, mut session) = engine.start("national-survey", "s1").await.unwrap();
        session.submit_raw("A").unwrap();
        let pending = session.pending_record().unwrap().id;

        assert!(matches!(
            engine.commit(&mut session).await,
            Err(EngineError::Store(StoreError::Unavailable(_)))
        ));
        assert!(session.pending_record().is_some());

        let record = engine.commit(&mut session).await.unwrap();
        assert_eq!(record.id, pending);
        assert_eq!(store.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_assessment_and_missing_assessment_differ() {
        let engine = engine(Arc::new(FlakyStore::new(0)), 0);
        assert!(matches!(
            engine.start("empty", "s1").await,
            Err(EngineError::Session(SessionError::NoQuestions { .. }))
        ));
        assert!(matches!(
            engine.start("nope", "s1").await,
            Err(EngineError::Store(StoreError::AssessmentNotFound(_)))
        ));
    }
}
