//! Processing of deferred submissions
//!
//! A scheduler (cron, the CLI's `--process-queue`) drains the queue filled by
//! [`DispatchMode::Deferred`](crate::DispatchMode) submissions.

use crate::error::{ConnectorError, ConnectorResult};
use crate::queue::QueuedUnit;
use crate::submitter::BatchSubmitter;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Default)]
pub struct DrainReport {
    pub processed: usize,
    pub failed: Vec<(QueuedUnit, ConnectorError)>,
}

#[derive(Debug, Clone)]
pub struct QueueWorker {
    submitter: Arc<BatchSubmitter>,
}

impl QueueWorker {
    pub fn new(submitter: Arc<BatchSubmitter>) -> Self {
        Self { submitter }
    }

    /// Process one unit and save the job
    ///
    /// A failed unit leaves the job item untranslated; it is not re-queued.
    /// Units of a job rejected after they were queued are dropped without a
    /// remote call.
    pub async fn process_item(&self, unit: &QueuedUnit) -> ConnectorResult<()> {
        let store = self.submitter.store();
        let mut job = store.get(unit.job_id()).await?;

        if job.is_rejected() {
            warn!(job_id = job.id, "job was rejected, skipping queued translation");
            return Ok(());
        }

        match unit {
            QueuedUnit::JobItem {
                job_item_id,
                keys,
                texts,
                ..
            } => {
                let chunk_size = self.submitter.chunk_size();
                self.submitter
                    .translate_item(&mut job, *job_item_id, keys, texts, chunk_size)
                    .await?;
            }
            QueuedUnit::Job { .. } => {
                self.submitter.batch_request_translation(&job).await?;
            }
        }

        store.save(&job).await
    }

    /// Process queued units until the queue is empty
    ///
    /// Failures are logged and collected; they do not stop the drain.
    pub async fn drain(&self) -> ConnectorResult<DrainReport> {
        let queue = self.submitter.queue();
        let mut report = DrainReport::default();

        while let Some(unit) = queue.pop().await? {
            match self.process_item(&unit).await {
                Ok(()) => report.processed += 1,
                Err(err) => {
                    error!(
                        "Unable to translate job: {}, the following exception was thrown: {}",
                        unit.job_id(),
                        err
                    );
                    report.failed.push((unit, err));
                }
            }
        }

        info!(
            processed = report.processed,
            failed = report.failed.len(),
            "queue drained"
        );
        Ok(report)
    }
}
