//! LangConnector translation service
//!
//! Sends each job item's text in chunks of [`DEFAULT_CHUNK_SIZE`] and reads
//! the translations from the response. Source languages are collapsed to
//! their base code because the service accepts fewer source variants than
//! target variants.

use crate::adapter::{BatchingPolicy, DEFAULT_CHUNK_SIZE, RemoteProtocolAdapter, not_configured};
use crate::config::{Availability, TranslatorSettings};
use crate::escape::Escaper;
use crate::language;
use serde_json::Value;

pub const LANG_CONNECTOR_URL: &str = "https://api.locale.to";

#[derive(Debug, Clone)]
pub struct LangConnector {
    escaper: Escaper,
    chunk_size: usize,
}

impl LangConnector {
    pub fn new() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            escaper: Escaper::lang_connector(),
            chunk_size,
        }
    }
}

impl Default for LangConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteProtocolAdapter for LangConnector {
    fn name(&self) -> &str {
        "LangConnector"
    }

    fn escaper(&self) -> &Escaper {
        &self.escaper
    }

    fn batching(&self) -> BatchingPolicy {
        BatchingPolicy::Chunked {
            chunk_size: self.chunk_size,
        }
    }

    fn default_url(&self) -> Option<&str> {
        Some(LANG_CONNECTOR_URL)
    }

    fn map_source_language(&self, local: &str) -> String {
        language::fix_source_language(&language::remote_language(local))
    }

    fn is_healthy(&self, body: &Value) -> bool {
        body.get("data").and_then(Value::as_str) == Some("ok")
    }

    /// Only the auth key is required, the URL has a default
    fn check_available(&self, settings: &TranslatorSettings) -> Availability {
        if settings.auth_key.trim().is_empty() {
            return not_configured(self.name());
        }
        Availability::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SubmissionUnit;
    use crate::job::TranslationJob;
    use serde_json::json;

    #[test]
    fn test_chunk_payload_fixes_source_language_only() {
        let adapter = LangConnector::new();
        let job = TranslationJob::new(12, "pt-br", "pt-br");
        let texts = vec!["Olá".to_string()];
        let payload = adapter.build_payload(&SubmissionUnit::Chunk { job: &job, texts: &texts });
        assert_eq!(
            payload,
            json!({ "job_id": 12, "source_lang": "PT", "target_lang": "PT-BR", "text": ["Olá"] })
        );
    }

    #[test]
    fn test_default_chunk_size() {
        assert_eq!(
            LangConnector::new().batching(),
            BatchingPolicy::Chunked { chunk_size: 5 }
        );
    }

    #[test]
    fn test_availability_requires_auth_key() {
        let adapter = LangConnector::new();
        assert!(
            adapter
                .check_available(&TranslatorSettings::new("", "key"))
                .is_available()
        );
        assert!(
            !adapter
                .check_available(&TranslatorSettings::new(LANG_CONNECTOR_URL, " "))
                .is_available()
        );
    }

    #[test]
    fn test_health_shape() {
        let adapter = LangConnector::new();
        assert_eq!(adapter.health_url("https://api.locale.to"), "https://api.locale.to");
        assert!(adapter.is_healthy(&json!({ "data": "ok" })));
        assert!(!adapter.is_healthy(&json!({ "id": 1 })));
    }
}
