//! Translator settings
//!
//! Settings are read from `TMGMT_CONNECTOR_*` environment variables or from a
//! JSON file:
//!
//! ```json
//! { "url": "https://api.locale.to", "auth_key": "secret", "tag_handling": true }
//! ```

use crate::error::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ENV_URL: &str = "TMGMT_CONNECTOR_URL";
pub const ENV_AUTH_KEY: &str = "TMGMT_CONNECTOR_AUTH_KEY";
pub const ENV_TAG_HANDLING: &str = "TMGMT_CONNECTOR_TAG_HANDLING";
pub const ENV_OUTLINE_DETECTION: &str = "TMGMT_CONNECTOR_OUTLINE_DETECTION";
pub const ENV_TIMEOUT_SECS: &str = "TMGMT_CONNECTOR_TIMEOUT_SECS";

/// Settings of one configured translator
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatorSettings {
    /// Remote API URL
    #[serde(default)]
    pub url: String,
    /// Value of the `Authorization` header
    #[serde(default)]
    pub auth_key: String,
    #[serde(default = "default_tag_handling")]
    pub tag_handling: bool,
    /// Only meaningful with tag handling enabled
    #[serde(default)]
    pub outline_detection: bool,
    /// Request timeout. `None` keeps the HTTP client's default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_tag_handling() -> bool {
    true
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth_key: String::new(),
            tag_handling: default_tag_handling(),
            outline_detection: false,
            timeout_secs: None,
        }
    }
}

impl TranslatorSettings {
    pub fn new(url: &str, auth_key: &str) -> Self {
        Self {
            url: url.to_string(),
            auth_key: auth_key.to_string(),
            ..Self::default()
        }
    }

    /// Load settings from the `TMGMT_CONNECTOR_*` environment variables
    pub fn from_env() -> ConnectorResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> ConnectorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(url) = lookup(ENV_URL) {
            settings.url = url.trim().to_string();
        }
        if let Some(auth_key) = lookup(ENV_AUTH_KEY) {
            settings.auth_key = auth_key.trim().to_string();
        }
        if let Some(value) = lookup(ENV_TAG_HANDLING) {
            settings.tag_handling = parse_flag(ENV_TAG_HANDLING, &value)?;
        }
        if let Some(value) = lookup(ENV_OUTLINE_DETECTION) {
            settings.outline_detection = parse_flag(ENV_OUTLINE_DETECTION, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            let secs = value.trim().parse::<u64>().map_err(|_| {
                ConnectorError::Configuration(format!(
                    "{} must be a number of seconds, got '{}'",
                    ENV_TIMEOUT_SECS, value
                ))
            })?;
            settings.timeout_secs = Some(secs);
        }

        Ok(settings.normalized())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> ConnectorResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::Configuration(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        let settings: TranslatorSettings = serde_json::from_str(&content).map_err(|e| {
            ConnectorError::Configuration(format!(
                "Invalid settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(settings.normalized())
    }

    /// Outline detection is forced off when tag handling is disabled
    pub fn normalized(mut self) -> Self {
        if !self.tag_handling {
            self.outline_detection = false;
        }
        self
    }

    /// Fill an empty URL with a service default
    pub fn with_default_url(mut self, default_url: &str) -> Self {
        if self.url.is_empty() {
            self.url = default_url.to_string();
        }
        self
    }
}

fn parse_flag(name: &str, value: &str) -> ConnectorResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConnectorError::Configuration(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}

impl std::fmt::Debug for TranslatorSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorSettings")
            .field("url", &self.url)
            .field("auth_key", &"***")
            .field("tag_handling", &self.tag_handling)
            .field("outline_detection", &self.outline_detection)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Whether a translator can currently be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    /// Turn an unavailable result into a configuration error
    pub fn into_result(self) -> ConnectorResult<()> {
        match self {
            Availability::Available => Ok(()),
            Availability::Unavailable(reason) => Err(ConnectorError::Configuration(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_reads_all_settings() {
        let settings = TranslatorSettings::from_lookup(lookup(&[
            (ENV_URL, " https://api.example.test "),
            (ENV_AUTH_KEY, "secret"),
            (ENV_TAG_HANDLING, "yes"),
            (ENV_OUTLINE_DETECTION, "1"),
            (ENV_TIMEOUT_SECS, "15"),
        ]))
        .unwrap();

        assert_eq!(settings.url, "https://api.example.test");
        assert_eq!(settings.auth_key, "secret");
        assert!(settings.tag_handling);
        assert!(settings.outline_detection);
        assert_eq!(settings.timeout_secs, Some(15));
    }

    #[test]
    fn test_disabled_tag_handling_forces_outline_detection_off() {
        let settings = TranslatorSettings::from_lookup(lookup(&[
            (ENV_TAG_HANDLING, "0"),
            (ENV_OUTLINE_DETECTION, "1"),
        ]))
        .unwrap();
        assert!(!settings.tag_handling);
        assert!(!settings.outline_detection);
    }

    #[test]
    fn test_invalid_flag_is_configuration_error() {
        let result = TranslatorSettings::from_lookup(lookup(&[(ENV_TAG_HANDLING, "maybe")]));
        assert!(matches!(result, Err(ConnectorError::Configuration(_))));
    }

    #[test]
    fn test_defaults_keep_transport_timeout() {
        let settings = TranslatorSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.timeout_secs, None);
        assert!(settings.tag_handling);
        assert!(settings.url.is_empty());
    }

    #[test]
    fn test_deserialize_normalizes() {
        let settings: TranslatorSettings =
            serde_json::from_str(r#"{"url":"u","auth_key":"k","tag_handling":false,"outline_detection":true}"#)
                .unwrap();
        assert!(!settings.normalized().outline_detection);
    }

    #[test]
    fn test_debug_masks_auth_key() {
        let settings = TranslatorSettings::new("https://api.locale.to", "top-secret");
        let debug_str = format!("{:?}", settings);
        assert!(debug_str.contains("***"));
        assert!(!debug_str.contains("top-secret"));
    }

    #[test]
    fn test_with_default_url() {
        let settings = TranslatorSettings::new("", "k").with_default_url("https://api.locale.to");
        assert_eq!(settings.url, "https://api.locale.to");
        let settings = TranslatorSettings::new("https://x", "k").with_default_url("https://api.locale.to");
        assert_eq!(settings.url, "https://x");
    }

    #[test]
    fn test_availability_into_result() {
        assert!(Availability::Available.into_result().is_ok());
        assert_eq!(
            Availability::Unavailable("missing key".to_string()).into_result(),
            Err(ConnectorError::Configuration("missing key".to_string()))
        );
    }
}
