//! Translation jobs and job items
//!
//! Jobs are owned by the host system; the connector only reads them and
//! mutates the fields below (state, settings, messages, item data).

use crate::data::{self, ARRAY_DELIMITER};
use crate::error::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub type JobId = u64;
pub type JobItemId = u64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Draft,
    Submitted,
    Rejected,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobItemState {
    #[default]
    Inactive,
    Active,
    /// Translations were received for every translatable leaf
    Translated,
    Accepted,
}

/// One translatable content entity within a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobItem {
    pub id: JobItemId,
    #[serde(default)]
    pub job_id: JobId,
    /// Id of the source content
    pub item_id: String,
    /// Type (bundle) of the source content
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub state: JobItemState,
    /// Nested field data, see [`crate::data`]
    #[serde(default)]
    pub data: Value,
}

impl JobItem {
    pub fn new(id: JobItemId, item_id: &str, item_type: &str, data: Value) -> Self {
        Self {
            id,
            job_id: 0,
            item_id: item_id.to_string(),
            item_type: item_type.to_string(),
            state: JobItemState::Inactive,
            data,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == JobItemState::Active
    }

    pub fn is_translated(&self) -> bool {
        self.state == JobItemState::Translated
    }

    pub fn activate(&mut self) {
        if self.state == JobItemState::Inactive {
            self.state = JobItemState::Active;
        }
    }

    /// Translation stored for a flattened key, if any
    pub fn translation(&self, key: &str) -> Option<&str> {
        data::node(&self.data, key)?
            .get("#translation")?
            .get("#text")?
            .as_str()
    }

    /// Commit translated leaves onto the item's data
    ///
    /// `translated` has the nested shape produced by [`data::unflatten`].
    /// Each leaf is stored under the matching source leaf's `#translation`.
    /// Nothing is written unless every key addresses an existing source
    /// leaf. The item is marked translated once every translatable leaf has
    /// a translation. Returns the number of leaves written.
    pub fn add_translated_data(&mut self, translated: &Value) -> ConnectorResult<usize> {
        let flat = data::flatten(translated);

        for (key, _) in flat.iter() {
            match data::node(&self.data, key) {
                Some(Value::String(_)) => {}
                Some(Value::Object(leaf)) if leaf.contains_key("#text") => {}
                _ => {
                    return Err(ConnectorError::Apply(format!(
                        "job item {} has no source text at '{}'",
                        self.id, key
                    )));
                }
            }
        }

        for (key, text) in flat.iter() {
            let Some(node) = data::node_mut(&mut self.data, key) else {
                continue;
            };
            if let Value::String(source) = &mut *node {
                let source = std::mem::take(source);
                *node = json!({ "#text": source });
            }
            if let Value::Object(leaf) = &mut *node {
                leaf.insert("#translation".to_string(), json!({ "#text": text }));
            }
        }

        if self.has_all_translations() {
            self.state = JobItemState::Translated;
        }

        Ok(flat.len())
    }

    fn has_all_translations(&self) -> bool {
        let source = data::flatten(&self.data);
        !source.is_empty() && source.iter().all(|(key, _)| self.translation(key).is_some())
    }
}

/// A unit of translation work for one source/target language pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationJob {
    pub id: JobId,
    /// Local source language code
    pub source_language: String,
    /// Local target language code
    pub target_language: String,
    #[serde(default)]
    pub state: JobState,
    /// Continuous jobs accept new items after submission
    #[serde(default)]
    pub continuous: bool,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub items: Vec<JobItem>,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl TranslationJob {
    pub fn new(id: JobId, source_language: &str, target_language: &str) -> Self {
        Self {
            id,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            state: JobState::Draft,
            continuous: false,
            settings: Map::new(),
            items: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_item(mut self, mut item: JobItem) -> Self {
        item.job_id = self.id;
        self.items.push(item);
        self
    }

    pub fn with_setting(mut self, key: &str, value: Value) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }

    pub fn is_rejected(&self) -> bool {
        self.state == JobState::Rejected
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Mark the job submitted and activate its inactive items
    ///
    /// A rejected job stays rejected. Returns whether the state changed.
    pub fn submitted(&mut self, message: &str) -> bool {
        if self.is_rejected() {
            return false;
        }
        self.state = JobState::Submitted;
        for item in &mut self.items {
            item.activate();
        }
        self.add_message(message);
        true
    }

    pub fn rejected(&mut self, message: &str) {
        self.state = JobState::Rejected;
        self.add_message(message);
    }

    pub fn add_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }

    pub fn set_setting(&mut self, key: &str, value: Value) {
        self.settings.insert(key.to_string(), value);
    }

    /// Identifier grouping sibling jobs into one remote batch
    pub fn batch_id(&self) -> Option<&str> {
        self.setting("batch_id").and_then(Value::as_str)
    }

    pub fn is_processed(&self) -> bool {
        self.setting("processed").and_then(Value::as_bool) == Some(true)
    }

    pub fn item(&self, id: JobItemId) -> Option<&JobItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: JobItemId) -> Option<&mut JobItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn active_items(&self) -> impl Iterator<Item = &JobItem> {
        self.items.iter().filter(|item| item.is_active())
    }

    /// Commit job-level translated data
    ///
    /// Top-level keys of `translated` are job item ids; each subtree is
    /// committed with [`JobItem::add_translated_data`]. The job is left
    /// untouched if any item id or data key is unknown.
    pub fn add_translated_data(&mut self, translated: &Value) -> ConnectorResult<usize> {
        let Value::Object(per_item) = translated else {
            return Err(ConnectorError::Apply(
                "translated data must be an object keyed by job item id".to_string(),
            ));
        };

        let mut staged = self.items.clone();
        let mut written = 0;

        for (item_key, subtree) in per_item {
            let item_id = item_key.parse::<JobItemId>().map_err(|_| {
                ConnectorError::Apply(format!(
                    "'{}' is not a job item id (keys look like '<item id>{}<field>')",
                    item_key, ARRAY_DELIMITER
                ))
            })?;
            let item = staged
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| {
                    ConnectorError::Apply(format!(
                        "job {} has no item {}",
                        self.id, item_id
                    ))
                })?;
            written += item.add_translated_data(subtree)?;
        }

        self.items = staged;
        Ok(written)
    }
}
