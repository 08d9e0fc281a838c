//! OpenAI-compatible `/chat/completions` exchange shared by both adapters.
//!
//! Groq exposes the same wire protocol as `OpenAI` under a different base
//! URL, so request encoding, transport, and success parsing live here. Error
//! classification stays in each adapter because the backends word their
//! failures differently.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::config::{HttpSettings, ProviderName};
use super::types::{ChatCompletion, ChatMessage, CompletionOptions, LlmError};

// =============================================================================
// CLIENT
// =============================================================================

/// Cached HTTP handle for one backend.
pub struct CompatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

/// Raw status + body of a finished HTTP exchange.
#[derive(Debug)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl CompatClient {
    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if reqwest cannot build the client.
    pub fn new(api_key: &str, settings: &HttpSettings) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(settings.timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key: api_key.to_string(), base_url: settings.base_url.clone() })
    }

    /// POST the chat-completion request and capture whatever comes back.
    ///
    /// # Errors
    ///
    /// Returns the transport error when no HTTP response was received.
    pub async fn send(
        &self,
        messages: &[ChatMessage],
        model: &str,
        options: CompletionOptions,
    ) -> Result<HttpReply, reqwest::Error> {
        let body = CcRequest {
            model,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_output_tokens,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
pub(crate) struct CcRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Message and code pulled out of an `{"error": {...}}` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub message: String,
    pub code: Option<String>,
}

impl BackendError {
    /// Parse the backend's error envelope. Falls back to the raw body so the
    /// original text is never lost.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|root| root.get("error"));
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| body.trim().to_string());
        let code = error
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self { message, code }
    }

    /// Whether the message or code mentions any of `markers`.
    #[must_use]
    pub fn mentions(&self, markers: &[&str]) -> bool {
        let message = self.message.to_lowercase();
        markers
            .iter()
            .any(|m| message.contains(m) || self.code.as_deref() == Some(*m))
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

/// Parse a 2xx chat-completion body into a [`ChatCompletion`].
///
/// # Errors
///
/// [`LlmError::EmptyResponse`] when `choices[0].message.content` is missing
/// or blank, [`LlmError::ProviderUnknown`] when the body is not JSON.
pub fn parse_completion(provider: ProviderName, json_text: &str, requested_model: &str) -> Result<ChatCompletion, LlmError> {
    let root: Value = serde_json::from_str(json_text).map_err(|e| LlmError::ProviderUnknown {
        provider,
        detail: format!("unparseable response body ({e}): {json_text}"),
    })?;

    let model = root
        .get("model")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(requested_model)
        .to_string();

    let Some(choice) = root
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
    else {
        return Err(LlmError::EmptyResponse { provider, detail: "missing choices[0]".to_string() });
    };

    let content = choice
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or("");
    if content.trim().is_empty() {
        let finish_reason = choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        return Err(LlmError::EmptyResponse {
            provider,
            detail: format!("choices[0] has no message content (finish_reason: {finish_reason})"),
        });
    }

    Ok(ChatCompletion { content: content.to_string(), model, provider })
}

/// Transport failure (DNS, TLS, timeout, reset) as a provider error.
#[must_use]
pub fn transport_error(provider: ProviderName, err: &reqwest::Error) -> LlmError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    LlmError::ProviderUnknown { provider, detail: format!("{kind}: {err}") }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::{Arc, Mutex};

    use axum::Json;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use serde_json::Value;

    /// Last request body seen by a loopback backend.
    pub type Captured = Arc<Mutex<Option<Value>>>;

    /// Serve a fixed `/chat/completions` reply on 127.0.0.1 and return its base URL.
    pub async fn spawn_backend(status: StatusCode, reply: Value) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(None));
        let seen = captured.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move |Json(req): Json<Value>| {
                let seen = seen.clone();
                let reply = reply.clone();
                async move {
                    *seen.lock().unwrap() = Some(req);
                    (status, Json(reply))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    /// A chat-completion success body with `content`.
    #[must_use]
    pub fn completion_body(model: &str, content: &str) -> Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": model,
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
        })
    }
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;
