//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the database pool, the prompt template store, the LLM provider
//! runtime, and the directory attachments are stored in. Every field is
//! cheap to clone.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::PgPool;

use crate::llm::ProviderRuntime;
use crate::services::prompts::PromptStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub prompts: Arc<PromptStore>,
    pub runtime: Arc<ProviderRuntime>,
    pub uploads_dir: Arc<PathBuf>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, prompts: PromptStore, runtime: ProviderRuntime, uploads_dir: PathBuf) -> Self {
        Self {
            pool,
            prompts: Arc::new(prompts),
            runtime: Arc::new(runtime),
            uploads_dir: Arc::new(uploads_dir),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
