//! LLM types — provider-neutral messages, completions, and errors.
//!
//! Shared by the Groq and `OpenAI` adapters. Adapters translate these into
//! their wire format and normalize every outcome back into [`ChatCompletion`]
//! or one [`LlmError`] variant.

use serde::{Deserialize, Serialize};

use super::config::ProviderName;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4000;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by provider selection and chat-completion adapters.
///
/// Every backend-derived variant keeps the backend's own error text so an
/// operator can diagnose the failure from the message alone.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Neither backend has a credential configured.
    #[error("no AI provider API key configured: set GROQ_API_KEY or OPENAI_API_KEY")]
    Configuration,

    /// `complete` was called before `initialize`.
    #[error("{provider} client not initialized: call initialize first")]
    Uninitialized { provider: ProviderName },

    /// The backend answered 2xx but without any textual content.
    #[error("{provider} did not return a valid response: {detail}")]
    EmptyResponse { provider: ProviderName, detail: String },

    /// The backend rejected the credential.
    #[error("{provider} API key is invalid, check the configuration: {body}")]
    Authentication { provider: ProviderName, status: u16, body: String },

    /// The backend throttled the request or the account ran out of quota.
    #[error("{provider} request limit exceeded, try again later: {body}")]
    RateLimit { provider: ProviderName, body: String },

    /// The backend reports the requested model as retired.
    #[error("{provider} decommissioned model '{model}', set {env_var} to a supported model: {body}")]
    DeprecatedModel { provider: ProviderName, model: String, env_var: &'static str, body: String },

    /// Any other client error reported by the backend.
    #[error("{provider} rejected the request (status {status}): {body}")]
    ProviderRequest { provider: ProviderName, status: u16, body: String },

    /// Transport failures, server errors, and unparseable responses.
    #[error("{provider} analysis failed: {detail}")]
    ProviderUnknown { provider: ProviderName, detail: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl crate::error::ErrorCode for LlmError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration => "E_CONFIGURATION",
            Self::Uninitialized { .. } => "E_UNINITIALIZED",
            Self::EmptyResponse { .. } => "E_EMPTY_RESPONSE",
            Self::Authentication { .. } => "E_AUTHENTICATION",
            Self::RateLimit { .. } => "E_RATE_LIMIT",
            Self::DeprecatedModel { .. } => "E_DEPRECATED_MODEL",
            Self::ProviderRequest { .. } => "E_PROVIDER_REQUEST",
            Self::ProviderUnknown { .. } => "E_PROVIDER_UNKNOWN",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::RateLimit { .. } | Self::ProviderUnknown { .. })
    }
}

// =============================================================================
// MESSAGE TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single message in the payload. Order is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Generation knobs forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self { temperature: DEFAULT_TEMPERATURE, max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS }
    }
}

/// Normalized successful completion. `content` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatCompletion {
    pub content: String,
    pub model: String,
    pub provider: ProviderName,
}

// =============================================================================
// ADAPTER TRAIT
// =============================================================================

/// One backend's chat-completion capability. Callers hold only this trait.
#[async_trait::async_trait]
pub trait ChatCompletionAdapter: Send + Sync {
    /// Backend this adapter talks to.
    fn provider(&self) -> ProviderName;

    /// Build and cache the client handle. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client cannot be built.
    fn initialize(&self, api_key: &str) -> Result<(), LlmError>;

    /// Whether `initialize` has succeeded.
    fn is_initialized(&self) -> bool;

    /// Send one chat-completion request.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Uninitialized`] before `initialize`, otherwise the
    /// classified backend failure.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        options: CompletionOptions,
    ) -> Result<ChatCompletion, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
