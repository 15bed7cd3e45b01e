//! Job storage
//!
//! Jobs live in the host system. The connector reaches them through
//! [`JobStore`]; [`InMemoryJobStore`] backs the CLI, the callback server and
//! the tests.

use crate::error::{ConnectorError, ConnectorResult};
use crate::job::{JobId, TranslationJob};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn load(&self, id: JobId) -> ConnectorResult<Option<TranslationJob>>;

    async fn save(&self, job: &TranslationJob) -> ConnectorResult<()>;

    /// Jobs carrying the given batch id, highest id first
    async fn find_by_batch(&self, batch_id: &str) -> ConnectorResult<Vec<TranslationJob>>;

    /// Like [`JobStore::load`], but a missing job is an error
    async fn get(&self, id: JobId) -> ConnectorResult<TranslationJob> {
        self.load(id).await?.ok_or(ConnectorError::JobNotFound(id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<BTreeMap<JobId, TranslationJob>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: impl IntoIterator<Item = TranslationJob>) -> Self {
        let jobs = jobs.into_iter().map(|job| (job.id, job)).collect();
        Self {
            jobs: Arc::new(RwLock::new(jobs)),
        }
    }

    pub async fn all(&self) -> Vec<TranslationJob> {
        self.jobs.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn load(&self, id: JobId) -> ConnectorResult<Option<TranslationJob>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn save(&self, job: &TranslationJob) -> ConnectorResult<()> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn find_by_batch(&self, batch_id: &str) -> ConnectorResult<Vec<TranslationJob>> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .values()
            .rev()
            .filter(|job| job.batch_id() == Some(batch_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = InMemoryJobStore::new();
        store.save(&TranslationJob::new(1, "en", "fr")).await.unwrap();
        assert_eq!(store.load(1).await.unwrap().unwrap().target_language, "fr");
        assert!(store.load(2).await.unwrap().is_none());
        assert_eq!(store.get(2).await, Err(ConnectorError::JobNotFound(2)));
    }

    #[tokio::test]
    async fn test_find_by_batch_sorted_descending() {
        let store = InMemoryJobStore::with_jobs([
            TranslationJob::new(1, "en", "fr").with_setting("batch_id", json!("b1")),
            TranslationJob::new(3, "en", "de").with_setting("batch_id", json!("b1")),
            TranslationJob::new(2, "en", "it").with_setting("batch_id", json!("b2")),
            TranslationJob::new(4, "en", "es"),
        ]);
        let ids: Vec<u64> = store
            .find_by_batch("b1")
            .await
            .unwrap()
            .iter()
            .map(|job| job.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
