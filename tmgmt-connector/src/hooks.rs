//! Extension points
//!
//! Hooks are registered when the submitter is built. Closures implement the
//! hook traits directly:
//!
//! ```ignore
//! let hooks = Hooks::new().with_request_builder(|job: &TranslationJob, payload: &mut Value| {
//!     payload["priority"] = json!(job.setting("priority").cloned().unwrap_or(json!("normal")));
//! });
//! ```

use crate::job::TranslationJob;
use serde_json::Value;
use std::sync::Arc;

/// Runs on every outbound payload right before it is sent
pub trait RequestBuilderHook: Send + Sync {
    fn alter_request(&self, job: &TranslationJob, payload: &mut Value);
}

/// Decides whether a job needs checkout settings
pub trait CheckoutSettingsHook: Send + Sync {
    /// `current` is the answer so far (initially `false`)
    fn has_checkout_settings(&self, job: &TranslationJob, current: bool) -> bool;
}

impl<F> RequestBuilderHook for F
where
    F: Fn(&TranslationJob, &mut Value) + Send + Sync,
{
    fn alter_request(&self, job: &TranslationJob, payload: &mut Value) {
        self(job, payload)
    }
}

impl<F> CheckoutSettingsHook for F
where
    F: Fn(&TranslationJob, bool) -> bool + Send + Sync,
{
    fn has_checkout_settings(&self, job: &TranslationJob, current: bool) -> bool {
        self(job, current)
    }
}

#[derive(Clone, Default)]
pub struct Hooks {
    request_builders: Vec<Arc<dyn RequestBuilderHook>>,
    checkout_settings: Vec<Arc<dyn CheckoutSettingsHook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_builder(mut self, hook: impl RequestBuilderHook + 'static) -> Self {
        self.request_builders.push(Arc::new(hook));
        self
    }

    pub fn with_checkout_settings(mut self, hook: impl CheckoutSettingsHook + 'static) -> Self {
        self.checkout_settings.push(Arc::new(hook));
        self
    }

    /// Run the request builder hooks in registration order
    pub fn alter_request(&self, job: &TranslationJob, payload: &mut Value) {
        for hook in &self.request_builders {
            hook.alter_request(job, payload);
        }
    }

    pub fn has_checkout_settings(&self, job: &TranslationJob) -> bool {
        self.checkout_settings
            .iter()
            .fold(false, |current, hook| hook.has_checkout_settings(job, current))
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("request_builders", &self.request_builders.len())
            .field("checkout_settings", &self.checkout_settings.len())
            .finish()
    }
}
