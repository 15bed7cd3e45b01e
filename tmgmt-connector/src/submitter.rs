//! Batch submission of translation jobs
//!
//! Every submission of a job item's text moves through
//!
//! ```text
//! Pending -> Chunking -> AwaitingResponse(0) -> Merging(0)
//!                     -> AwaitingResponse(1) -> Merging(1) -> ...
//!                     -> Finalizing -> Applied
//! ```
//!
//! and ends in `Failed` as soon as one step errors. Translations of finished
//! chunks are only folded into a [`BatchContext`]; nothing is committed to
//! the job item until every chunk has succeeded.
//!
//! The caller picks the [`DispatchMode`]: `Immediate` runs the remote calls
//! now, `Deferred` persists the job and leaves one [`QueuedUnit`] per job
//! item (or per batch) for [`crate::QueueWorker`].

use crate::adapter::{BatchingPolicy, DEFAULT_CHUNK_SIZE, RemoteProtocolAdapter, SubmissionUnit};
use crate::apply;
use crate::config::{Availability, TranslatorSettings};
use crate::data;
use crate::error::{ConnectorError, ConnectorResult};
use crate::escape::Escaper;
use crate::hooks::Hooks;
use crate::job::{JobId, JobItemId, JobItemState, TranslationJob};
use crate::progress::{ProgressReporter, TracingProgress};
use crate::queue::{QueuedUnit, WorkQueue};
use crate::remote::{RemoteClient, decode_translations};
use crate::store::JobStore;
use crate::xtm_connect::XtmConnect;
use indexmap::IndexMap;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SUBMITTED_MESSAGE: &str = "The translation job has been submitted.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Hand the work to the queue, processed later by a scheduler
    Deferred,
    /// Run every remote call now, reporting progress step by step
    Immediate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Pending,
    Chunking,
    AwaitingResponse { chunk: usize },
    Merging { chunk: usize },
    Finalizing,
    Applied,
    Failed(ConnectorError),
}

/// A contiguous slice of one item's flattened text, sent in one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationChunk {
    /// Position of the first text in the item's flattened sequence
    pub offset: usize,
    pub keys: Vec<String>,
    pub texts: Vec<String>,
}

impl TranslationChunk {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Split parallel key/text sequences into chunks of at most `size` texts
///
/// Yields `ceil(N / size)` chunks; only the last one may be shorter.
pub fn chunk(keys: &[String], texts: &[String], size: usize) -> ConnectorResult<Vec<TranslationChunk>> {
    if size == 0 {
        return Err(ConnectorError::Configuration(
            "chunk size must be at least 1".to_string(),
        ));
    }
    if keys.len() != texts.len() {
        return Err(ConnectorError::Apply(format!(
            "{} keys but {} texts to translate",
            keys.len(),
            texts.len()
        )));
    }

    Ok(keys
        .chunks(size)
        .zip(texts.chunks(size))
        .enumerate()
        .map(|(i, (keys, texts))| TranslationChunk {
            offset: i * size,
            keys: keys.to_vec(),
            texts: texts.to_vec(),
        })
        .collect())
}

/// Translations collected so far for one job item
///
/// Each chunk step consumes the context and returns the extended one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchContext {
    index: usize,
    total: usize,
    translation: IndexMap<String, String>,
}

impl BatchContext {
    /// A context for an item with `total` flattened keys
    pub fn new(total: usize) -> Self {
        Self {
            index: 0,
            total,
            translation: IndexMap::new(),
        }
    }

    /// Number of texts translated so far
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_complete(&self) -> bool {
        self.index == self.total
    }

    pub fn translation(&self) -> &IndexMap<String, String> {
        &self.translation
    }

    /// Fold one chunk's raw translations into the context
    ///
    /// The chunk must start where the previous one ended and the service must
    /// return exactly one translation per text sent. Raw translations are
    /// decoded and unescaped before they are stored.
    pub fn merge(
        mut self,
        chunk: &TranslationChunk,
        translated: Vec<String>,
        escaper: &Escaper,
    ) -> ConnectorResult<Self> {
        if chunk.offset != self.index {
            return Err(ConnectorError::MalformedResponse(format!(
                "chunk at offset {} merged out of order, expected offset {}",
                chunk.offset, self.index
            )));
        }
        if translated.len() != chunk.len() {
            return Err(ConnectorError::MalformedResponse(format!(
                "sent {} texts but received {} translations",
                chunk.len(),
                translated.len()
            )));
        }
        if self.index + translated.len() > self.total {
            return Err(ConnectorError::MalformedResponse(format!(
                "received more translations than the {} texts of the item",
                self.total
            )));
        }

        for (key, raw) in chunk.keys.iter().zip(translated) {
            self.translation.insert(key.clone(), escaper.decode_remote(&raw));
            self.index += 1;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    pub job_item_id: JobItemId,
    /// `Pending` when the item was queued, `Applied` when translated
    pub state: SubmissionState,
    /// Remote calls made for the item
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub job_id: JobId,
    pub mode: DispatchMode,
    /// Whether the job was marked submitted
    pub submitted: bool,
    pub items: Vec<ItemOutcome>,
    /// Units handed to the work queue
    pub queued: usize,
    /// Whether a sibling batch request was sent
    pub batch_sent: bool,
}

impl SubmissionOutcome {
    fn new(job_id: JobId, mode: DispatchMode) -> Self {
        Self {
            job_id,
            mode,
            submitted: false,
            items: Vec::new(),
            queued: 0,
            batch_sent: false,
        }
    }
}

/// Submits jobs to one remote translation service
pub struct BatchSubmitter {
    adapter: Arc<dyn RemoteProtocolAdapter>,
    client: RemoteClient,
    store: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
    hooks: Hooks,
    progress: Arc<dyn ProgressReporter>,
}

impl BatchSubmitter {
    pub fn new(
        adapter: Arc<dyn RemoteProtocolAdapter>,
        settings: TranslatorSettings,
        store: Arc<dyn JobStore>,
        queue: Arc<dyn WorkQueue>,
    ) -> ConnectorResult<Self> {
        let settings = match adapter.default_url() {
            Some(url) => settings.with_default_url(url),
            None => settings,
        }
        .normalized();
        let client = RemoteClient::new(settings, adapter.name())?;

        Ok(Self {
            adapter,
            client,
            store,
            queue,
            hooks: Hooks::default(),
            progress: Arc::new(TracingProgress),
        })
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn adapter(&self) -> &dyn RemoteProtocolAdapter {
        self.adapter.as_ref()
    }

    pub fn settings(&self) -> &TranslatorSettings {
        self.client.settings()
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<dyn WorkQueue> {
        &self.queue
    }

    /// Chunk size for item texts; sibling-batch services fall back to the default
    pub fn chunk_size(&self) -> usize {
        match self.adapter.batching() {
            BatchingPolicy::Chunked { chunk_size } => chunk_size,
            BatchingPolicy::SiblingJobs => DEFAULT_CHUNK_SIZE,
        }
    }

    /// Settings check, no network involved
    pub fn check_available(&self) -> Availability {
        self.adapter.check_available(self.client.settings())
    }

    /// Settings check followed by a health request
    pub async fn validate(&self) -> Availability {
        let availability = self.check_available();
        if !availability.is_available() {
            return availability;
        }
        let url = self.adapter.health_url(&self.client.settings().url);
        self.client
            .validate(&url, |body| self.adapter.is_healthy(body))
            .await
    }

    pub fn has_checkout_settings(&self, job: &TranslationJob) -> bool {
        self.hooks.has_checkout_settings(job)
    }

    /// Give the job a batch id unless it already has one
    pub fn assign_batch_id(&self, job: &mut TranslationJob) -> String {
        if let Some(batch_id) = job.batch_id() {
            return batch_id.to_string();
        }
        let batch_id = XtmConnect::generate_batch_id();
        job.set_setting("batch_id", json!(batch_id));
        batch_id
    }

    /// Request translation of a job
    ///
    /// A rejected job makes no remote call and is never marked submitted.
    /// On success the job is marked submitted and saved; deferred units are
    /// queued only after the job is saved. On failure the error is recorded
    /// on the job, the job is saved and the error is returned.
    pub async fn request_translation(
        &self,
        job: &mut TranslationJob,
        mode: DispatchMode,
    ) -> ConnectorResult<SubmissionOutcome> {
        self.check_available().into_result()?;

        let mut outcome = SubmissionOutcome::new(job.id, mode);
        if job.is_rejected() {
            warn!(job_id = job.id, "job is rejected, not requesting translation");
            return Ok(outcome);
        }

        info!(
            job_id = job.id,
            service = self.adapter.name(),
            ?mode,
            "requesting translation"
        );

        let dispatched = match self.adapter.batching() {
            BatchingPolicy::Chunked { chunk_size } => {
                self.request_items_translation(job, chunk_size, mode, &mut outcome)
                    .await
            }
            BatchingPolicy::SiblingJobs => {
                self.send_job_for_translation(job, mode, &mut outcome).await
            }
        };

        let units = match dispatched {
            Ok(units) => units,
            Err(err) => {
                job.add_message(&format!("Translation request failed: {}", err));
                self.store.save(job).await?;
                return Err(err);
            }
        };

        outcome.submitted = job.submitted(SUBMITTED_MESSAGE);
        self.store.save(job).await?;

        for unit in units {
            self.queue.push(unit).await?;
            outcome.queued += 1;
        }

        Ok(outcome)
    }

    /// Chunked policy: flatten and escape every item, then either queue it
    /// or translate it right away
    async fn request_items_translation(
        &self,
        job: &mut TranslationJob,
        chunk_size: usize,
        mode: DispatchMode,
        outcome: &mut SubmissionOutcome,
    ) -> ConnectorResult<Vec<QueuedUnit>> {
        let escaper = self.adapter.escaper();
        let continuous = job.is_continuous();
        let item_ids: Vec<JobItemId> = job
            .items
            .iter()
            .filter(|item| item.state != JobItemState::Accepted)
            .map(|item| item.id)
            .collect();
        let mut units = Vec::new();

        for item_id in item_ids {
            let Some(item) = job.item_mut(item_id) else {
                continue;
            };
            if continuous {
                item.activate();
            }

            let flat = data::flatten(&item.data);
            if flat.is_empty() {
                debug!(job_id = item.job_id, job_item_id = item_id, "nothing to translate");
                continue;
            }
            let keys = flat.keys();
            let texts: Vec<String> = flat
                .leaves()
                .iter()
                .map(|leaf| escaper.escape(&leaf.text, &leaf.escape))
                .collect();

            match mode {
                DispatchMode::Deferred => {
                    units.push(QueuedUnit::JobItem {
                        job_id: job.id,
                        job_item_id: item_id,
                        keys,
                        texts,
                    });
                    outcome.items.push(ItemOutcome {
                        job_item_id: item_id,
                        state: SubmissionState::Pending,
                        chunks: 0,
                    });
                }
                DispatchMode::Immediate => {
                    let item_outcome = self
                        .translate_item(job, item_id, &keys, &texts, chunk_size)
                        .await?;
                    outcome.items.push(item_outcome);
                }
            }
        }

        Ok(units)
    }

    /// Run the chunk fold for one item and commit the result
    pub(crate) async fn translate_item(
        &self,
        job: &mut TranslationJob,
        item_id: JobItemId,
        keys: &[String],
        texts: &[String],
        chunk_size: usize,
    ) -> ConnectorResult<ItemOutcome> {
        let mut state = SubmissionState::Pending;

        let context = match self
            .run_chunks(job, item_id, keys, texts, chunk_size, &mut state)
            .await
        {
            Ok(context) => context,
            Err(err) => return Err(self.fail(job.id, item_id, &mut state, err)),
        };
        let chunks = match state {
            SubmissionState::Merging { chunk } => chunk + 1,
            _ => 0,
        };

        transition(job.id, item_id, &mut state, SubmissionState::Finalizing);
        let applied = match job.item_mut(item_id) {
            Some(item) => apply::apply_to_item(item, context.translation()),
            None => Err(ConnectorError::Apply(format!(
                "job {} has no item {}",
                job.id, item_id
            ))),
        };
        if let Err(err) = applied {
            return Err(self.fail(job.id, item_id, &mut state, err));
        }

        transition(job.id, item_id, &mut state, SubmissionState::Applied);
        self.progress.finished(
            true,
            &format!("Translation of job item {} completed.", item_id),
        );

        Ok(ItemOutcome {
            job_item_id: item_id,
            state,
            chunks,
        })
    }

    async fn run_chunks(
        &self,
        job: &TranslationJob,
        item_id: JobItemId,
        keys: &[String],
        texts: &[String],
        chunk_size: usize,
        state: &mut SubmissionState,
    ) -> ConnectorResult<BatchContext> {
        transition(job.id, item_id, state, SubmissionState::Chunking);
        let chunks = chunk(keys, texts, chunk_size)?;
        let total = chunks.len();
        let mut context = BatchContext::new(keys.len());

        for (i, chunk) in chunks.iter().enumerate() {
            transition(job.id, item_id, state, SubmissionState::AwaitingResponse { chunk: i });
            let unit = SubmissionUnit::Chunk {
                job,
                texts: &chunk.texts,
            };
            let body = self.call(job, &unit).await?;
            let translated = decode_translations(&body)?;

            transition(job.id, item_id, state, SubmissionState::Merging { chunk: i });
            context = context.merge(chunk, translated, self.adapter.escaper())?;
            self.progress.step(i + 1, total, "Translating job items");
        }

        if !context.is_complete() {
            return Err(ConnectorError::MalformedResponse(format!(
                "received {} of {} translations",
                context.index(),
                keys.len()
            )));
        }
        Ok(context)
    }

    fn fail(
        &self,
        job_id: JobId,
        item_id: JobItemId,
        state: &mut SubmissionState,
        err: ConnectorError,
    ) -> ConnectorError {
        transition(job_id, item_id, state, SubmissionState::Failed(err.clone()));
        self.progress.finished(
            false,
            &format!("Translation of job item {} failed: {}", item_id, err),
        );
        err
    }

    /// Sibling-jobs policy: send (or queue) one request for the whole batch
    /// and tag every job of the batch as processed
    ///
    /// Already processed jobs are skipped unless continuous, so a batch is
    /// sent once however many of its jobs are requested. In immediate mode
    /// the tags are only written once the request succeeded, so a failed
    /// batch is sent again on the next request.
    async fn send_job_for_translation(
        &self,
        job: &mut TranslationJob,
        mode: DispatchMode,
        outcome: &mut SubmissionOutcome,
    ) -> ConnectorResult<Vec<QueuedUnit>> {
        if job.is_continuous() {
            for item in &mut job.items {
                item.activate();
            }
        } else if job.is_processed() {
            debug!(job_id = job.id, "batch already sent for this job");
            return Ok(Vec::new());
        }

        let batch_id = self.assign_batch_id(job);
        if mode == DispatchMode::Immediate {
            self.batch_request_translation(job).await?;
            outcome.batch_sent = true;
        }
        self.mark_batch_processed(job, &batch_id).await?;

        match mode {
            DispatchMode::Deferred => Ok(vec![QueuedUnit::Job { job_id: job.id }]),
            DispatchMode::Immediate => Ok(Vec::new()),
        }
    }

    /// Tag `job` and its stored siblings with the batch id and `processed`
    async fn mark_batch_processed(
        &self,
        job: &mut TranslationJob,
        batch_id: &str,
    ) -> ConnectorResult<()> {
        for mut sibling in self.store.find_by_batch(batch_id).await? {
            if sibling.id == job.id {
                continue;
            }
            mark_processed(&mut sibling, batch_id);
            self.store.save(&sibling).await?;
        }
        mark_processed(job, batch_id);
        Ok(())
    }

    /// Send one request listing every job of `job`'s batch that has items
    ///
    /// `job` itself is taken as given, the other siblings are read from the
    /// store. Returns the number of jobs listed.
    pub async fn batch_request_translation(&self, job: &TranslationJob) -> ConnectorResult<usize> {
        let batch_id = job.batch_id().ok_or_else(|| {
            ConnectorError::Configuration(format!("job {} has no batch id", job.id))
        })?;

        let siblings: Vec<TranslationJob> = self
            .store
            .find_by_batch(batch_id)
            .await?
            .into_iter()
            .filter(|sibling| sibling.id != job.id)
            .collect();
        let mut jobs: Vec<&TranslationJob> = siblings.iter().chain(std::iter::once(job)).collect();
        jobs.retain(|sibling| !sibling.items.is_empty());
        jobs.sort_by(|a, b| b.id.cmp(&a.id));

        let unit = SubmissionUnit::Batch {
            batch_id,
            jobs: &jobs,
        };
        match self.call(job, &unit).await {
            Ok(_) => {
                self.progress.step(1, 1, "Processing translation request");
                self.progress
                    .finished(true, "Translation request processed successfully.");
                Ok(jobs.len())
            }
            Err(err) => {
                self.progress.finished(
                    false,
                    "Translation request failed to process. Please check the logs for more information.",
                );
                Err(err)
            }
        }
    }

    /// Build the payload for a unit, run the request hooks and send it
    async fn call(&self, job: &TranslationJob, unit: &SubmissionUnit<'_>) -> ConnectorResult<Value> {
        let mut payload = self.adapter.build_payload(unit);
        self.hooks.alter_request(job, &mut payload);
        self.client.send(&payload).await
    }
}

impl std::fmt::Debug for BatchSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSubmitter")
            .field("service", &self.adapter.name())
            .field("client", &self.client)
            .field("hooks", &self.hooks)
            .finish()
    }
}

fn mark_processed(job: &mut TranslationJob, batch_id: &str) {
    job.set_setting("batch_id", json!(batch_id));
    job.set_setting("processed", json!(true));
}

fn transition(job_id: JobId, item_id: JobItemId, state: &mut SubmissionState, next: SubmissionState) {
    debug!(job_id, job_item_id = item_id, from = ?state, to = ?next, "submission state");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_chunk_counts_and_order() {
        for (n, size) in [(0usize, 5usize), (1, 5), (5, 5), (6, 5), (12, 5), (7, 1), (3, 10)] {
            let keys: Vec<String> = (0..n).map(|i| format!("k{}", i)).collect();
            let texts: Vec<String> = (0..n).map(|i| format!("t{}", i)).collect();
            let chunks = chunk(&keys, &texts, size).unwrap();

            assert_eq!(chunks.len(), n.div_ceil(size), "n={} size={}", n, size);
            if let Some((last, rest)) = chunks.split_last() {
                assert!(rest.iter().all(|c| c.len() == size));
                assert!(last.len() <= size && !last.is_empty());
            }
            let rejoined: Vec<String> = chunks.iter().flat_map(|c| c.texts.clone()).collect();
            assert_eq!(rejoined, texts);
            let offsets: Vec<usize> = chunks.iter().map(|c| c.offset).collect();
            assert_eq!(offsets, (0..chunks.len()).map(|i| i * size).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_chunk_rejects_zero_size_and_mismatch() {
        let keys = strings(&["a"]);
        assert!(matches!(
            chunk(&keys, &keys, 0),
            Err(ConnectorError::Configuration(_))
        ));
        assert!(matches!(
            chunk(&keys, &strings(&["a", "b"]), 5),
            Err(ConnectorError::Apply(_))
        ));
    }

    #[test]
    fn test_batch_context_folds_chunks() {
        let escaper = Escaper::lang_connector();
        let keys = strings(&["a", "b", "c"]);
        let chunks = chunk(&keys, &strings(&["A", "B", "C"]), 2).unwrap();

        let context = BatchContext::new(3)
            .merge(&chunks[0], strings(&["x &amp; y", "b%20b"]), &escaper)
            .unwrap();
        assert_eq!(context.index(), 2);
        assert!(!context.is_complete());

        let context = context.merge(&chunks[1], strings(&["c"]), &escaper).unwrap();
        assert!(context.is_complete());
        assert_eq!(
            context.translation().iter().map(|(k, v)| (k.as_str(), v.as_str())).collect::<Vec<_>>(),
            vec![("a", "x & y"), ("b", "b b"), ("c", "c")]
        );
    }

    #[test]
    fn test_batch_context_rejects_short_and_out_of_order() {
        let escaper = Escaper::lang_connector();
        let keys = strings(&["a", "b", "c"]);
        let chunks = chunk(&keys, &keys, 2).unwrap();

        let short = BatchContext::new(3).merge(&chunks[0], strings(&["x"]), &escaper);
        assert!(matches!(short, Err(ConnectorError::MalformedResponse(_))));

        let out_of_order = BatchContext::new(3).merge(&chunks[1], strings(&["x"]), &escaper);
        assert!(matches!(out_of_order, Err(ConnectorError::MalformedResponse(_))));
    }

    #[test]
    fn test_batch_context_index_never_exceeds_total() {
        let escaper = Escaper::lang_connector();
        let keys = strings(&["a", "b"]);
        let chunks = chunk(&keys, &keys, 5).unwrap();
        let result = BatchContext::new(1).merge(&chunks[0], strings(&["x", "y"]), &escaper);
        assert!(matches!(result, Err(ConnectorError::MalformedResponse(_))));
    }
}
