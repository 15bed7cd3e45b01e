//! HTTP client for the remote translation services
//!
//! Both services take a JSON body and authenticate with the raw auth key in
//! the `Authorization` header:
//!
//! ```text
//! POST <url>
//! Content-Type: application/json
//! Authorization: <auth key>
//! ```
//!
//! No timeout is set unless configured and no request is retried; failures
//! are returned to the caller.

use crate::config::{Availability, TranslatorSettings};
use crate::error::{ConnectorError, ConnectorResult};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{Value, json};
use std::time::Duration;

/// Client bound to one translator's settings
#[derive(Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
    settings: TranslatorSettings,
    /// Service name used in log lines and error messages
    service_name: String,
}

impl RemoteClient {
    pub fn new(settings: TranslatorSettings, service_name: &str) -> ConnectorResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            ConnectorError::Configuration(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            settings,
            service_name: service_name.to_string(),
        })
    }

    pub fn settings(&self) -> &TranslatorSettings {
        &self.settings
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// POST a JSON payload to the configured URL and return the decoded body
    ///
    /// * no response at all: [`ConnectorError::Transport`]
    /// * non-2xx status: [`ConnectorError::RemoteService`] with the reason phrase
    /// * 204: an empty `{"translations": []}` result
    /// * other 2xx: the JSON body, or [`ConnectorError::MalformedResponse`]
    pub async fn send(&self, payload: &Value) -> ConnectorResult<Value> {
        let body = serde_json::to_vec(payload)?;

        tracing::debug!(
            service = %self.service_name,
            url = %self.settings.url,
            bytes = body.len(),
            "sending translation request"
        );

        let response = self
            .client
            .post(&self.settings.url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &self.settings.auth_key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(service = %self.service_name, error = %e, "translation request failed");
                ConnectorError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string();
            tracing::warn!(
                service = %self.service_name,
                status = status.as_u16(),
                reason = %reason,
                "translation service returned an error"
            );
            return Err(ConnectorError::RemoteService {
                status: status.as_u16(),
                reason,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(json!({ "translations": [] }));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ConnectorError::MalformedResponse(format!(
                "{} API service returned a body that is not JSON: {}",
                self.service_name, e
            ))
        })
    }

    /// Check reachability and credentials with a GET request
    ///
    /// Never fails: every problem is reported as [`Availability::Unavailable`].
    pub async fn validate<F>(&self, url: &str, is_healthy: F) -> Availability
    where
        F: Fn(&Value) -> bool,
    {
        let response = match self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &self.settings.auth_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Availability::Unavailable(format!(
                    "{} API service is unreachable: {}",
                    self.service_name, e
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Availability::Unavailable(format!(
                "{} API service returned status {}",
                self.service_name,
                status.as_u16()
            ));
        }

        match response.json::<Value>().await {
            Ok(body) if is_healthy(&body) => Availability::Available,
            _ => Availability::Unavailable("Please check the url and key.".to_string()),
        }
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("service_name", &self.service_name)
            .field("settings", &self.settings)
            .finish()
    }
}

/// Extract the ordered translated texts from `{"translations": [{"text": ...}]}`
///
/// A body without `translations` yields no texts. Anything else that does
/// not have this shape is a malformed response.
pub fn decode_translations(body: &Value) -> ConnectorResult<Vec<String>> {
    let Value::Object(map) = body else {
        return Err(ConnectorError::MalformedResponse(
            "response body is not a JSON object".to_string(),
        ));
    };

    match map.get("translations") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.get("text")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ConnectorError::MalformedResponse(format!(
                            "translation {} has no 'text' field",
                            i
                        ))
                    })
            })
            .collect(),
        Some(_) => Err(ConnectorError::MalformedResponse(
            "'translations' is not a list".to_string(),
        )),
    }
}
