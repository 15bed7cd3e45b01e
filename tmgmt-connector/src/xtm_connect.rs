//! XTMConnect translation service
//!
//! Jobs checked out together share a batch id. One request lists every
//! sibling job of the batch; the service fetches the items itself and posts
//! translations back through the inbound callback.

use crate::adapter::{BatchingPolicy, RemoteProtocolAdapter, not_configured};
use crate::config::{Availability, TranslatorSettings};
use crate::escape::Escaper;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct XtmConnect {
    escaper: Escaper,
}

impl XtmConnect {
    pub fn new() -> Self {
        Self {
            escaper: Escaper::xtm_connect(),
        }
    }

    /// A fresh identifier for a group of jobs checked out together
    pub fn generate_batch_id() -> String {
        format!("xtm_batch_{}", uuid::Uuid::new_v4().simple())
    }
}

impl Default for XtmConnect {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteProtocolAdapter for XtmConnect {
    fn name(&self) -> &str {
        "XTMConnect"
    }

    fn escaper(&self) -> &Escaper {
        &self.escaper
    }

    fn batching(&self) -> BatchingPolicy {
        BatchingPolicy::SiblingJobs
    }

    // Language codes are passed as the site knows them.
    fn map_source_language(&self, local: &str) -> String {
        local.to_string()
    }

    fn map_target_language(&self, local: &str) -> String {
        local.to_string()
    }

    fn health_url(&self, base_url: &str) -> String {
        format!("{}/health", base_url.trim_end_matches('/'))
    }

    fn is_healthy(&self, body: &Value) -> bool {
        body.get("id").is_some_and(|id| !id.is_null())
    }

    fn check_available(&self, settings: &TranslatorSettings) -> Availability {
        if settings.auth_key.trim().is_empty() || settings.url.trim().is_empty() {
            return not_configured(self.name());
        }
        Availability::Available
    }
}
