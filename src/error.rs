//! Error codes — shared classification for every public error enum.
//!
//! DESIGN
//! ======
//! Each module owns its own `thiserror` enum. This module only adds the
//! grepable `E_*` code and retryable hint, and turns any classified error
//! into the JSON body returned by the HTTP layer:
//!
//! ```json
//! { "error": "<summary>", "code": "E_RATE_LIMIT", "message": "<detail>", "retryable": true }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Trait for errors that carry a grepable code.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// JSON error payload returned by every route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// An HTTP status paired with an error body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    /// Build from a classified error, keeping its full display text as `message`.
    #[must_use]
    pub fn from_code(status: StatusCode, summary: &str, err: &(impl ErrorCode + ?Sized)) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: summary.to_string(),
                code: err.error_code(),
                message: err.to_string(),
                retryable: err.retryable(),
            },
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody { error: message.clone(), code: "E_BAD_REQUEST", message, retryable: false },
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody { error: message.clone(), code: "E_NOT_FOUND", message, retryable: false },
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody { error: message.clone(), code: "E_INTERNAL", message, retryable: false },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
