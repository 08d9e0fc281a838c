//! LLM — provider selection, chat-completion adapters, and the runtime that
//! owns them.
//!
//! DESIGN
//! ======
//! Callers hold only [`ChatCompletionAdapter`] trait objects, built by
//! [`adapter_for`] from a [`ProviderName`]. [`ProviderRuntime`] owns one
//! adapter per backend plus an at-most-once initialization guard:
//!
//! - the client handle is created once, on the first successful
//!   [`ProviderRuntime::ensure_initialized`], and reused afterwards;
//! - the routing decision (which adapter, which model) is re-resolved from
//!   configuration on every [`ProviderRuntime::complete`] call.
//!
//! If configuration changes after initialization so that routing points at
//! an adapter that was never initialized, the call fails with
//! [`LlmError::Uninitialized`] rather than silently re-initializing.

pub mod config;
pub mod groq;
pub mod openai;
pub mod types;
pub mod wire;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::info;

pub use config::{EnvLookup, ProviderConfig, ProviderName};
pub use types::{ChatCompletion, ChatCompletionAdapter, ChatMessage, ChatRole, CompletionOptions, LlmError};

// =============================================================================
// FACTORY
// =============================================================================

/// Build the adapter for `provider`, reading its HTTP settings from `lookup`.
#[must_use]
pub fn adapter_for(provider: ProviderName, lookup: &EnvLookup) -> Arc<dyn ChatCompletionAdapter> {
    match provider {
        ProviderName::Groq => Arc::new(groq::GroqAdapter::from_lookup(lookup)),
        ProviderName::OpenAi => Arc::new(openai::OpenAiAdapter::from_lookup(lookup)),
    }
}

// =============================================================================
// RUNTIME
// =============================================================================

/// Snapshot of the configured provider for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub provider: String,
    pub model: String,
    pub available: bool,
}

pub struct ProviderRuntime {
    lookup: Arc<EnvLookup>,
    adapters: HashMap<ProviderName, Arc<dyn ChatCompletionAdapter>>,
    initialized: OnceCell<ProviderName>,
}

impl ProviderRuntime {
    /// Runtime with both real adapters, configured from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let lookup: Arc<EnvLookup> = Arc::new(config::process_env);
        Self::new(lookup)
    }

    /// Runtime with both real adapters, configured from `lookup`.
    #[must_use]
    pub fn new(lookup: Arc<EnvLookup>) -> Self {
        let adapters = [ProviderName::Groq, ProviderName::OpenAi]
            .into_iter()
            .map(|p| adapter_for(p, lookup.as_ref()))
            .collect();
        Self::with_adapters(lookup, adapters)
    }

    /// Runtime over caller-supplied adapters, keyed by their own provider name.
    #[must_use]
    pub fn with_adapters(lookup: Arc<EnvLookup>, adapters: Vec<Arc<dyn ChatCompletionAdapter>>) -> Self {
        let adapters = adapters.into_iter().map(|a| (a.provider(), a)).collect();
        Self { lookup, adapters, initialized: OnceCell::new() }
    }

    /// Initialize the selected provider's client, once per runtime.
    ///
    /// Concurrent first callers are serialized; a failed attempt leaves the
    /// runtime uninitialized so a later call can retry after reconfiguration.
    ///
    /// # Errors
    ///
    /// [`LlmError::Configuration`] when no key is configured, or the
    /// adapter's initialization error.
    pub async fn ensure_initialized(&self) -> Result<ProviderName, LlmError> {
        self.initialized
            .get_or_try_init(|| async {
                let config = self.resolve_route()?;
                self.adapter(config.provider)?.initialize(&config.api_key)?;
                info!(provider = %config.provider, model = %config.model, "llm: provider initialized");
                Ok::<_, LlmError>(config.provider)
            })
            .await
            .copied()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Re-read which provider and model the next call should use.
    ///
    /// # Errors
    ///
    /// [`LlmError::Configuration`] when no key is configured.
    pub fn resolve_route(&self) -> Result<ProviderConfig, LlmError> {
        ProviderConfig::resolve(self.lookup.as_ref())
    }

    fn adapter(&self, provider: ProviderName) -> Result<&Arc<dyn ChatCompletionAdapter>, LlmError> {
        self.adapters
            .get(&provider)
            .ok_or(LlmError::Uninitialized { provider })
    }

    /// Route one completion to the currently configured provider.
    ///
    /// # Errors
    ///
    /// Propagates the adapter's error unchanged.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<ChatCompletion, LlmError> {
        let route = self.resolve_route()?;
        self.adapter(route.provider)?
            .complete(messages, &route.model, options)
            .await
    }

    /// Provider/model currently configured and whether a client is ready.
    #[must_use]
    pub fn info(&self) -> ProviderInfo {
        match self.resolve_route() {
            Ok(route) => ProviderInfo {
                provider: route.provider.to_string(),
                model: route.model,
                available: self.is_initialized(),
            },
            Err(_) => ProviderInfo { provider: "none".into(), model: "none".into(), available: false },
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
