//! Groq chat-completion adapter.
//!
//! Groq serves the OpenAI-compatible protocol at `/openai/v1`. Its 400
//! responses for retired models carry `model_decommissioned`, which is
//! surfaced as [`LlmError::DeprecatedModel`] so the operator knows to change
//! `GROQ_MODEL` rather than retry.

use std::sync::OnceLock;

use tracing::{info, warn};

use super::config::{EnvLookup, HttpSettings, ProviderName};
use super::types::{ChatCompletion, ChatCompletionAdapter, ChatMessage, CompletionOptions, LlmError};
use super::wire::{self, BackendError, CompatClient};

const PROVIDER: ProviderName = ProviderName::Groq;
const DECOMMISSION_MARKERS: &[&str] = &["decommissioned", "model_decommissioned"];

pub struct GroqAdapter {
    settings: HttpSettings,
    client: OnceLock<CompatClient>,
}

impl GroqAdapter {
    #[must_use]
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings, client: OnceLock::new() }
    }

    #[must_use]
    pub fn from_lookup(lookup: &EnvLookup) -> Self {
        Self::new(HttpSettings::resolve(PROVIDER, lookup))
    }
}

#[async_trait::async_trait]
impl ChatCompletionAdapter for GroqAdapter {
    fn provider(&self) -> ProviderName {
        PROVIDER
    }

    fn initialize(&self, api_key: &str) -> Result<(), LlmError> {
        if self.client.get().is_some() {
            return Ok(());
        }
        let client = CompatClient::new(api_key, &self.settings)?;
        if self.client.set(client).is_ok() {
            info!(base_url = %self.settings.base_url, "groq: client initialized");
        }
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.client.get().is_some()
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        options: CompletionOptions,
    ) -> Result<ChatCompletion, LlmError> {
        let client = self
            .client
            .get()
            .ok_or(LlmError::Uninitialized { provider: PROVIDER })?;

        let reply = client
            .send(messages, model, options)
            .await
            .map_err(|e| wire::transport_error(PROVIDER, &e))?;

        if !reply.is_success() {
            warn!(status = reply.status, body = %reply.body, model, "groq: API error");
            return Err(classify_error(reply.status, &reply.body, model));
        }

        wire::parse_completion(PROVIDER, &reply.body, model)
    }
}

/// Map a non-2xx Groq reply onto the shared taxonomy.
pub(crate) fn classify_error(status: u16, body: &str, model: &str) -> LlmError {
    let backend = BackendError::from_body(body);
    match status {
        401 => LlmError::Authentication { provider: PROVIDER, status, body: backend.message },
        429 => LlmError::RateLimit { provider: PROVIDER, body: backend.message },
        400 if backend.mentions(DECOMMISSION_MARKERS) => LlmError::DeprecatedModel {
            provider: PROVIDER,
            model: model.to_string(),
            env_var: PROVIDER.model_var(),
            body: backend.message,
        },
        400..=499 => LlmError::ProviderRequest { provider: PROVIDER, status, body: backend.message },
        _ => LlmError::ProviderUnknown { provider: PROVIDER, detail: format!("status {status}: {}", backend.message) },
    }
}

#[cfg(test)]
#[path = "groq_test.rs"]
mod tests;
