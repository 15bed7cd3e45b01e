//! Deferred work
//!
//! In deferred mode the submitter only enqueues work; a scheduler later hands
//! each unit to [`crate::QueueWorker`]. The queue is assumed to give each unit
//! to at most one worker at a time.

use crate::error::ConnectorResult;
use crate::job::{JobId, JobItemId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueuedUnit {
    /// One job item's flattened, escaped text
    JobItem {
        job_id: JobId,
        job_item_id: JobItemId,
        keys: Vec<String>,
        texts: Vec<String>,
    },
    /// A job whose sibling batch is still to be sent
    Job { job_id: JobId },
}

impl QueuedUnit {
    pub fn job_id(&self) -> JobId {
        match self {
            QueuedUnit::JobItem { job_id, .. } | QueuedUnit::Job { job_id } => *job_id,
        }
    }
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn push(&self, unit: QueuedUnit) -> ConnectorResult<()>;

    async fn pop(&self) -> ConnectorResult<Option<QueuedUnit>>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    units: Arc<Mutex<VecDeque<QueuedUnit>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the pending units, oldest first
    pub async fn pending(&self) -> Vec<QueuedUnit> {
        self.units.lock().await.iter().cloned().collect()
    }
}

#[async_trait]
impl WorkQueue for InMemoryQueue {
    async fn push(&self, unit: QueuedUnit) -> ConnectorResult<()> {
        self.units.lock().await.push_back(unit);
        Ok(())
    }

    async fn pop(&self) -> ConnectorResult<Option<QueuedUnit>> {
        Ok(self.units.lock().await.pop_front())
    }

    async fn len(&self) -> usize {
        self.units.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = InMemoryQueue::new();
        queue.push(QueuedUnit::Job { job_id: 1 }).await.unwrap();
        queue.push(QueuedUnit::Job { job_id: 2 }).await.unwrap();
        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.pop().await.unwrap().map(|u| u.job_id()), Some(1));
        assert_eq!(queue.pop().await.unwrap().map(|u| u.job_id()), Some(2));
        assert!(queue.pop().await.unwrap().is_none());
        assert!(queue.is_empty().await);
    }

    #[test]
    fn test_units_serialize_with_kind_tag() {
        let unit = QueuedUnit::JobItem {
            job_id: 3,
            job_item_id: 5,
            keys: vec!["title".to_string()],
            texts: vec!["Hello".to_string()],
        };
        let value = serde_json::to_value(&unit).unwrap();
        assert_eq!(
            value,
            json!({ "kind": "job_item", "job_id": 3, "job_item_id": 5, "keys": ["title"], "texts": ["Hello"] })
        );
        let back: QueuedUnit = serde_json::from_value(value).unwrap();
        assert_eq!(back, unit);
    }
}
