use super::*;
use crate::llm::ProviderName;
use crate::llm::test_helpers::{FakeEnv, MockAdapter, mock_runtime};
use crate::services::prompts::DEFAULT_TEMPLATE_ID;
use crate::state::test_helpers::test_app_state;
use std::sync::Arc;

fn state(dir: &tempfile::TempDir) -> AppState {
    let env = FakeEnv::default();
    let groq = Arc::new(MockAdapter::new(ProviderName::Groq, vec![]));
    let openai = Arc::new(MockAdapter::new(ProviderName::OpenAi, vec![]));
    test_app_state(dir.path(), mock_runtime(&env, groq, openai))
}

#[tokio::test]
async fn list_on_empty_store_returns_default() {
    let dir = tempfile::tempdir().unwrap();
    let Json(prompts) = list_prompts(State(state(&dir))).await.unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].id, DEFAULT_TEMPLATE_ID);
}

#[tokio::test]
async fn create_then_get_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let body: NewPrompt = serde_json::from_value(serde_json::json!({
        "nome": "Narrativo",
        "descricao": "Relatório em markdown",
        "prompt": "Analise {titulo}"
    }))
    .unwrap();
    let (status, Json(created)) = create_prompt(State(state.clone()), Json(body)).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.id.starts_with("prompt-"));
    assert!(!created.active);

    let Json(fetched) = get_prompt(State(state), Path(created.id.clone())).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_unknown_prompt_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let err = get_prompt(State(state(&dir)), Path("nada".into())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
    assert_eq!(err.body.code, "E_NOT_FOUND");
}

#[tokio::test]
async fn update_keeps_path_id() {
    let dir = tempfile::tempdir().unwrap();
    let state = state(&dir);

    let patch: PromptPatch = serde_json::from_value(serde_json::json!({"id": "outro", "ativo": false})).unwrap();
    let Json(updated) = update_prompt(State(state.clone()), Path(DEFAULT_TEMPLATE_ID.into()), Json(patch))
        .await
        .unwrap();
    assert_eq!(updated.id, DEFAULT_TEMPLATE_ID);
    assert!(!updated.active);

    let Json(all) = list_prompts(State(state)).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(!all[0].active);
}

#[tokio::test]
async fn update_unknown_prompt_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let err = update_prompt(State(state(&dir)), Path("nada".into()), Json(PromptPatch::default()))
        .await
        .unwrap_err();
    assert_eq!(err.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn save_failure_is_500_with_persistence_code() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("prompts.json")).unwrap();
    std::fs::write(dir.path().join("prompts.json").join("keep"), "x").unwrap();

    let err = create_prompt(State(state(&dir)), Json(NewPrompt::default())).await.unwrap_err();
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.body.code, "E_PROMPT_PERSISTENCE");
    assert_eq!(err.body.error, "Erro ao criar prompt");
}
