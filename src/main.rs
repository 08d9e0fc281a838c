mod config;
mod db;
mod error;
mod llm;
mod routes;
mod services;
mod state;

use config::AppConfig;
use llm::ProviderRuntime;
use services::prompts::PromptStore;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env().expect("invalid configuration");

    let pool = db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");

    std::fs::create_dir_all(&config.uploads_dir).expect("failed to create uploads directory");

    // Analysis stays unavailable until keys are configured; the runtime
    // retries initialization on the next analysis request.
    let runtime = ProviderRuntime::from_env();
    match runtime.ensure_initialized().await {
        Ok(provider) => tracing::info!(%provider, "AI provider ready"),
        Err(e) => tracing::warn!(error = %e, "AI features disabled until configured"),
    }

    let prompts = PromptStore::new(config.prompts_file.clone());
    tracing::info!(path = %prompts.path().display(), "prompt templates");

    let state = state::AppState::new(pool, prompts, runtime, config.uploads_dir.clone());
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "roadcheck listening");
    axum::serve(listener, app).await.expect("server failed");
}
