//! Prompt template routes.
//!
//! Every handler runs its store operation on the blocking pool. Create and
//! update rewrite the whole collection through the store's atomic save.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use tracing::error;

use crate::error::ApiError;
use crate::services::prompts::{NewPrompt, PromptPatch, PromptStoreError, PromptTemplate};
use crate::state::AppState;

pub(crate) fn prompt_error(err: &PromptStoreError, summary: &str) -> ApiError {
    error!(error = %err, "prompts: store operation failed");
    ApiError::from_code(StatusCode::INTERNAL_SERVER_ERROR, summary, err)
}

/// `GET /api/prompts`
pub async fn list_prompts(State(state): State<AppState>) -> Result<Json<Vec<PromptTemplate>>, ApiError> {
    let prompts = state
        .prompts
        .blocking(|store| store.load_all())
        .await
        .map_err(|e| prompt_error(&e, "Erro ao listar prompts"))?;
    Ok(Json(prompts))
}

/// `GET /api/prompts/{id}`
pub async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromptTemplate>, ApiError> {
    state
        .prompts
        .blocking(move |store| store.get_by_id(&id))
        .await
        .map_err(|e| prompt_error(&e, "Erro ao buscar prompt"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Prompt não encontrado"))
}

/// `POST /api/prompts`
pub async fn create_prompt(
    State(state): State<AppState>,
    Json(body): Json<NewPrompt>,
) -> Result<(StatusCode, Json<PromptTemplate>), ApiError> {
    let created = state
        .prompts
        .blocking(move |store| store.create(body))
        .await
        .and_then(|r| r)
        .map_err(|e| prompt_error(&e, "Erro ao criar prompt"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/prompts/{id}` — merge fields; the id never changes.
pub async fn update_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<PromptPatch>,
) -> Result<Json<PromptTemplate>, ApiError> {
    state
        .prompts
        .blocking(move |store| store.update(&id, patch))
        .await
        .and_then(|r| r)
        .map_err(|e| prompt_error(&e, "Erro ao atualizar prompt"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Prompt não encontrado"))
}

#[cfg(test)]
#[path = "prompts_test.rs"]
mod tests;
