//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api` and serves stored attachments
//! from the uploads directory under `/uploads`. CORS is permissive; the API
//! carries no authentication.

pub mod ai;
pub mod prompts;
pub mod solicitacoes;
pub mod uploads;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Largest accepted request body, sized for attachment uploads.
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let attachments = ServeDir::new(state.uploads_dir.as_path());

    Router::new()
        .route("/api/health", get(ai::health))
        .route("/api/ai/info", get(ai::info))
        .route(
            "/api/solicitacoes",
            get(solicitacoes::list_solicitacoes).post(solicitacoes::create_solicitacao),
        )
        .route(
            "/api/solicitacoes/{id}",
            get(solicitacoes::get_solicitacao)
                .put(solicitacoes::update_solicitacao)
                .delete(solicitacoes::delete_solicitacao),
        )
        .route("/api/solicitacoes/{id}/analisar", post(solicitacoes::analisar))
        .route("/api/solicitacoes/{id}/relatorio", get(solicitacoes::relatorio))
        .route("/api/prompts", get(prompts::list_prompts).post(prompts::create_prompt))
        .route("/api/prompts/{id}", get(prompts::get_prompt).put(prompts::update_prompt))
        .route("/api/uploads", post(uploads::upload_files))
        .nest_service("/uploads", attachments)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
