//! Committing translations onto jobs
//!
//! Used by the interactive path, the queue worker and the inbound callback
//! alike, so a translation is applied the same way whichever route it took.

use crate::data;
use crate::error::{ConnectorError, ConnectorResult};
use crate::job::{JobItem, TranslationJob};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::info;

/// Apply an ordered `key -> translated text` map to one job item
pub fn apply_to_item(
    item: &mut JobItem,
    translation: &IndexMap<String, String>,
) -> ConnectorResult<usize> {
    let keys: Vec<String> = translation.keys().cloned().collect();
    let texts: Vec<String> = translation.values().cloned().collect();
    let tree = data::unflatten(&keys, &texts)?;
    let written = item.add_translated_data(&tree)?;

    info!(
        job_id = item.job_id,
        job_item_id = item.id,
        written,
        translated = item.is_translated(),
        "applied translation to job item"
    );
    Ok(written)
}

/// Apply a raw job-level payload
///
/// The payload maps flattened keys whose first segment is the job item id
/// (`"5][title][0][value"`) to `{"#text": ...}` leaves or plain strings.
/// Already nested payloads (`{"5": {"title": ...}}`) are accepted too.
pub fn apply_to_job(job: &mut TranslationJob, payload: &Value) -> ConnectorResult<usize> {
    let Value::Object(flat) = payload else {
        return Err(ConnectorError::Apply(
            "translation payload must be a JSON object".to_string(),
        ));
    };

    let tree = data::unflatten_map(flat.iter().map(|(key, leaf)| (key.as_str(), leaf.clone())))?;
    let written = job.add_translated_data(&tree)?;
    job.add_message(&format!("Received {} translated texts.", written));

    info!(job_id = job.id, written, "applied translation payload to job");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobItem;
    use serde_json::json;

    fn job() -> TranslationJob {
        TranslationJob::new(1, "en", "fr")
            .with_item(JobItem::new(
                5,
                "100",
                "article",
                json!({ "title": { "0": { "value": { "#text": "Hello" } } }, "body": "World" }),
            ))
            .with_item(JobItem::new(6, "101", "page", json!({ "title": "Page" })))
    }

    #[test]
    fn test_apply_to_item_commits_and_marks_translated() {
        let mut job = job();
        let mut translation = IndexMap::new();
        translation.insert("title][0][value".to_string(), "Bonjour".to_string());
        translation.insert("body".to_string(), "Monde".to_string());

        let item = job.item_mut(5).unwrap();
        assert_eq!(apply_to_item(item, &translation).unwrap(), 2);
        assert!(item.is_translated());
        assert_eq!(item.translation("body"), Some("Monde"));
    }

    #[test]
    fn test_apply_to_job_flat_payload() {
        let mut job = job();
        let written = apply_to_job(
            &mut job,
            &json!({
                "5][title][0][value": { "#text": "Bonjour" },
                "5][body": "Monde",
                "6][title": { "#text": "Page FR" }
            }),
        )
        .unwrap();

        assert_eq!(written, 3);
        assert!(job.items.iter().all(|item| item.is_translated()));
        assert_eq!(job.messages.last().unwrap(), "Received 3 translated texts.");
    }

    #[test]
    fn test_apply_to_job_nested_payload() {
        let mut job = job();
        apply_to_job(&mut job, &json!({ "6": { "title": { "#text": "Page FR" } } })).unwrap();
        assert_eq!(job.item(6).unwrap().translation("title"), Some("Page FR"));
    }

    #[test]
    fn test_apply_to_job_rejects_non_object() {
        let mut job = job();
        assert!(matches!(
            apply_to_job(&mut job, &json!(["Bonjour"])),
            Err(ConnectorError::Apply(_))
        ));
    }

    #[test]
    fn test_apply_to_job_unknown_item() {
        let mut job = job();
        assert!(matches!(
            apply_to_job(&mut job, &json!({ "77][title": "x" })),
            Err(ConnectorError::Apply(_))
        ));
        assert!(job.messages.is_empty());
    }
}
