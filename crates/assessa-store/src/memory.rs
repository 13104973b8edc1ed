//! In-memory record store for tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use assessa_core::error::StoreError;
use assessa_core::record::{sort_newest_first, AssessmentRecord};
use assessa_core::traits::RecordStore;

/// Keeps records in a `Vec`, with optional injected failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<AssessmentRecord>>,
    /// Remaining inserts to fail with `StoreError::Unavailable`.
    failures: AtomicU32,
    /// Number of insert calls, successful or not.
    insert_calls: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose first `n` inserts fail with a transient error.
    pub fn failing(n: u32) -> Self {
        Self {
            failures: AtomicU32::new(n),
            ..Self::default()
        }
    }

    /// Get the number of insert calls made to this store.
    pub fn insert_calls(&self) -> u32 {
        self.insert_calls.load(Ordering::Relaxed)
    }

    /// Snapshot of every stored record, in insertion order.
    pub fn records(&self) -> Vec<AssessmentRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".into())
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, record: &AssessmentRecord) -> Result<(), StoreError> {
        self.insert_calls.fetch_add(1, Ordering::Relaxed);
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable("injected failure".into()));
        }

        let mut records = self.records.lock().map_err(poisoned)?;
        records.retain(|r| r.id != record.id);
        records.push(record.clone());
        Ok(())
    }

    async fn records_for(&self, respondent_id: &str) -> Result<Vec<AssessmentRecord>, StoreError> {
        let mut records: Vec<AssessmentRecord> = self
            .records
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|r| r.respondent_id == respondent_id)
            .cloned()
            .collect();
        sort_newest_first(&mut records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use assessa_core::engine::{AssessmentEngine, EngineConfig};
    use assessa_core::error::EngineError;
    use assessa_core::profile::{MacroCategory, ProfileNormalizer};

    use crate::file::DirectorySource;

    const SURVEY_TOML: &str = r#"
[assessment]
id = "national-survey"
title = "National Survey"

[[questions]]
id = "q1"
order_index = 1
content = "How often do you feel hopeful?"
options = [
  { label = "A", text = "Often", score = 5, dimension = "optimism" },
  { label = "B", text = "Rarely", score = 1, dimension = "optimism" },
]

[[questions]]
id = "q2"
order_index = 2
content = "What would help?"
type = "text"
dependency = { target_order_index = 1, trigger_value = "B" }
"#;

    fn engine(dir: &std::path::Path, store: Arc<MemoryStore>, retries: u32) -> AssessmentEngine {
        std::fs::write(dir.join("national-survey.toml"), SURVEY_TOML).unwrap();
        AssessmentEngine::new(
            Arc::new(DirectorySource::new(dir)),
            store,
            ProfileNormalizer::default(),
            EngineConfig {
                save_retries: retries,
                retry_delay: Duration::from_millis(1),
                ..EngineConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn engine_retries_until_the_store_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::failing(2));
        let engine = engine(dir.path(), store.clone(), 3);

        let (_, mut session) = engine.start("national-survey", "s1").await.unwrap();
        session.submit_raw("B").unwrap();
        session.submit_raw("more sleep").unwrap();
        let record = engine.commit(&mut session).await.unwrap();

        assert_eq!(store.insert_calls(), 3);
        assert_eq!(store.records(), vec![record]);

        let view = engine.history("s1").await.unwrap();
        assert_eq!(view.profile.get(MacroCategory::SocialEmotional), 20);
        assert_eq!(view.latest_score, Some(1.0));
    }

    #[tokio::test]
    async fn engine_gives_up_after_configured_retries() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::failing(5));
        let engine = engine(dir.path(), store.clone(), 1);

        let (_, mut session) = engine.start("national-survey", "s1").await.unwrap();
        session.submit_raw("A").unwrap();
        assert!(matches!(
            engine.commit(&mut session).await,
            Err(EngineError::Store(StoreError::Unavailable(_)))
        ));
        assert_eq!(store.insert_calls(), 2);
        assert!(store.records().is_empty());
        assert!(session.pending_record().is_some());
    }
}
