//! Health and AI provider status routes.

use axum::extract::State;
use axum::response::Json;

use crate::llm::ProviderInfo;
use crate::state::AppState;

/// `GET /api/health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /api/ai/info` — configured provider and whether its client is ready.
pub async fn info(State(state): State<AppState>) -> Json<ProviderInfo> {
    Json(state.runtime.info())
}

#[cfg(test)]
#[path = "ai_test.rs"]
mod tests;
