//! Provider selection and per-provider settings parsed from the environment.
//!
//! Selection is a strict priority order: a Groq key wins whenever present,
//! otherwise an `OpenAI` key, otherwise [`LlmError::Configuration`]. Every
//! resolver takes a lookup function so callers can substitute a map for the
//! process environment.

use std::fmt;

use serde::Serialize;

use super::types::LlmError;

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Lookup used by every resolver. Blank values are treated as absent.
pub type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Read a variable from the process environment.
#[must_use]
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_blank(lookup: &EnvLookup, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

// =============================================================================
// PROVIDER NAME
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    Groq,
    OpenAi,
}

impl ProviderName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
        }
    }

    /// Env var holding this provider's API key.
    #[must_use]
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Env var overriding this provider's model.
    #[must_use]
    pub fn model_var(self) -> &'static str {
        match self {
            Self::Groq => "GROQ_MODEL",
            Self::OpenAi => "OPENAI_MODEL",
        }
    }

    fn base_url_var(self) -> &'static str {
        match self {
            Self::Groq => "GROQ_BASE_URL",
            Self::OpenAi => "OPENAI_BASE_URL",
        }
    }

    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Groq => DEFAULT_GROQ_MODEL,
            Self::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::Groq => DEFAULT_GROQ_BASE_URL,
            Self::OpenAi => DEFAULT_OPENAI_BASE_URL,
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the backend to use from the available credentials.
///
/// # Errors
///
/// Returns [`LlmError::Configuration`] when neither key is set.
pub fn detect_provider(lookup: &EnvLookup) -> Result<ProviderName, LlmError> {
    [ProviderName::Groq, ProviderName::OpenAi]
        .into_iter()
        .find(|p| non_blank(lookup, p.api_key_var()).is_some())
        .ok_or(LlmError::Configuration)
}

// =============================================================================
// PROVIDER CONFIG
// =============================================================================

/// Credential and model for the selected provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider: ProviderName,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl ProviderConfig {
    /// Resolve provider, key and model.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] when neither key is set.
    pub fn resolve(lookup: &EnvLookup) -> Result<Self, LlmError> {
        let provider = detect_provider(lookup)?;
        let api_key = non_blank(lookup, provider.api_key_var()).ok_or(LlmError::Configuration)?;
        let model = non_blank(lookup, provider.model_var()).unwrap_or_else(|| provider.default_model().to_string());
        Ok(Self { provider, api_key, model })
    }
}

// =============================================================================
// HTTP SETTINGS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for LlmTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    }
}

/// Endpoint and timeouts for one adapter's HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub base_url: String,
    pub timeouts: LlmTimeouts,
}

impl HttpSettings {
    /// Resolve base URL and timeouts for `provider`.
    ///
    /// Optional:
    /// - `GROQ_BASE_URL` / `OPENAI_BASE_URL`
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn resolve(provider: ProviderName, lookup: &EnvLookup) -> Self {
        let base_url = non_blank(lookup, provider.base_url_var())
            .unwrap_or_else(|| provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = LlmTimeouts {
            request_secs: parse_u64(lookup, "LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup, "LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };
        Self { base_url, timeouts }
    }
}

fn parse_u64(lookup: &EnvLookup, key: &str, default: u64) -> u64 {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
