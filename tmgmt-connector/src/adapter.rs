//! Remote protocol adapters
//!
//! The submission workflow is shared by every translation service. What
//! differs between services is captured by [`RemoteProtocolAdapter`]:
//! the escape markers, the language vocabulary, how health checks look and
//! the batching policy, which decides whether one item's text is sent in
//! chunks or all sibling jobs of a batch are sent in a single request.
//!
//! Implementations: [`crate::LangConnector`], [`crate::XtmConnect`].

use crate::config::{Availability, TranslatorSettings};
use crate::escape::Escaper;
use crate::job::TranslationJob;
use crate::language;
use serde_json::{Value, json};

/// Default number of texts sent in one chunked request
pub const DEFAULT_CHUNK_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchingPolicy {
    /// Each job item's flattened text is split into chunks of at most
    /// `chunk_size` texts, one request per chunk
    Chunked { chunk_size: usize },
    /// All jobs sharing a batch id are listed in one request; translations
    /// come back later through the inbound callback
    SiblingJobs,
}

/// The payload of one remote call
#[derive(Debug, Clone, Copy)]
pub enum SubmissionUnit<'a> {
    Chunk {
        job: &'a TranslationJob,
        texts: &'a [String],
    },
    Batch {
        batch_id: &'a str,
        jobs: &'a [&'a TranslationJob],
    },
}

impl SubmissionUnit<'_> {
    /// Job the request is made on behalf of
    pub fn job_id(&self) -> Option<u64> {
        match self {
            SubmissionUnit::Chunk { job, .. } => Some(job.id),
            SubmissionUnit::Batch { jobs, .. } => jobs.first().map(|job| job.id),
        }
    }
}

pub trait RemoteProtocolAdapter: Send + Sync {
    /// Service name, used in logs and error messages
    fn name(&self) -> &str;

    fn escaper(&self) -> &Escaper;

    fn batching(&self) -> BatchingPolicy;

    /// URL used when the settings leave it empty
    fn default_url(&self) -> Option<&str> {
        None
    }

    fn map_source_language(&self, local: &str) -> String {
        language::remote_language(local)
    }

    fn map_target_language(&self, local: &str) -> String {
        language::remote_language(local)
    }

    /// Build the JSON body of one remote call
    ///
    /// * chunk: `{job_id, source_lang, target_lang, text: [...]}`
    /// * batch: `{jobs: [{job_id, source_lang, target_lang}, ...], batch_id}`
    fn build_payload(&self, unit: &SubmissionUnit<'_>) -> Value {
        match unit {
            SubmissionUnit::Chunk { job, texts } => json!({
                "job_id": job.id,
                "source_lang": self.map_source_language(&job.source_language),
                "target_lang": self.map_target_language(&job.target_language),
                "text": texts,
            }),
            SubmissionUnit::Batch { batch_id, jobs } => {
                let jobs: Vec<Value> = jobs
                    .iter()
                    .map(|job| {
                        json!({
                            "job_id": job.id,
                            "source_lang": self.map_source_language(&job.source_language),
                            "target_lang": self.map_target_language(&job.target_language),
                        })
                    })
                    .collect();
                json!({ "jobs": jobs, "batch_id": batch_id })
            }
        }
    }

    /// URL of the health/validate endpoint
    fn health_url(&self, base_url: &str) -> String {
        base_url.to_string()
    }

    /// Whether a health response body means "reachable and authorized"
    fn is_healthy(&self, body: &Value) -> bool;

    /// Static check of the settings, done before any submission
    fn check_available(&self, settings: &TranslatorSettings) -> Availability;
}

pub(crate) fn not_configured(name: &str) -> Availability {
    Availability::Unavailable(format!(
        "{} is not available. Make sure it is properly configured.",
        name
    ))
}
