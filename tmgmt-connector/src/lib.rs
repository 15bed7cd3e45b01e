//! Translation submission workflow for LangConnector and XTMConnect
//!
//! Job items hold nested field data. Submitting a job flattens that data into
//! `key -> text` pairs, escapes spans that must not be translated, sends the
//! texts to the remote service in chunks (or one request per batch of sibling
//! jobs) and commits the decoded translations back onto the job items.
//!
//! # Workflow Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use tmgmt_connector::{
//!     BatchSubmitter, DispatchMode, InMemoryJobStore, InMemoryQueue, JobItem, LangConnector,
//!     TranslationJob, TranslatorSettings,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let submitter = BatchSubmitter::new(
//!         Arc::new(LangConnector::new()),
//!         TranslatorSettings::from_env()?,
//!         Arc::new(InMemoryJobStore::new()),
//!         Arc::new(InMemoryQueue::new()),
//!     )?;
//!
//!     let mut job = TranslationJob::new(1, "en", "fr").with_item(JobItem::new(
//!         1,
//!         "42",
//!         "node",
//!         json!({ "title": { "#text": "Hello" } }),
//!     ));
//!
//!     submitter.request_translation(&mut job, DispatchMode::Immediate).await?;
//!     println!("{:?}", job.item(1).and_then(|item| item.translation("title")));
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod apply;
pub mod config;
pub mod data;
pub mod error;
pub mod escape;
pub mod hooks;
pub mod job;
pub mod lang_connector;
pub mod language;
pub mod progress;
pub mod queue;
pub mod remote;
pub mod store;
pub mod submitter;
pub mod worker;
pub mod xtm_connect;

// Re-export main types for convenient access
pub use adapter::{BatchingPolicy, DEFAULT_CHUNK_SIZE, RemoteProtocolAdapter, SubmissionUnit};
pub use apply::{apply_to_item, apply_to_job};
pub use config::{Availability, TranslatorSettings};
pub use data::{FlattenedText, TextLeaf, flatten, unflatten};
pub use error::{ConnectorError, ConnectorResult};
pub use escape::{EscapeSpan, Escaper};
pub use hooks::{CheckoutSettingsHook, Hooks, RequestBuilderHook};
pub use job::{JobId, JobItem, JobItemId, JobItemState, JobState, TranslationJob};
pub use lang_connector::LangConnector;
pub use progress::{ProgressReporter, TracingProgress};
pub use queue::{InMemoryQueue, QueuedUnit, WorkQueue};
pub use remote::RemoteClient;
pub use store::{InMemoryJobStore, JobStore};
pub use submitter::{
    BatchContext, BatchSubmitter, DispatchMode, ItemOutcome, SubmissionOutcome, SubmissionState,
    TranslationChunk, chunk,
};
pub use worker::{DrainReport, QueueWorker};
pub use xtm_connect::XtmConnect;

use std::sync::Arc;

/// Adapter for a translator plugin id (`lang_connector`, `xtm_connect`)
pub fn adapter_for(translator: &str) -> ConnectorResult<Arc<dyn RemoteProtocolAdapter>> {
    match translator {
        "lang_connector" => Ok(Arc::new(LangConnector::new())),
        "xtm_connect" => Ok(Arc::new(XtmConnect::new())),
        other => Err(ConnectorError::Configuration(format!(
            "Unknown translator '{}', expected lang_connector or xtm_connect",
            other
        ))),
    }
}
