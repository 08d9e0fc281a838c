//! Analysis orchestrator — turns one work request into one model completion.
//!
//! DESIGN
//! ======
//! One call runs the whole pipeline:
//!
//! 1. make sure a provider client exists (lazy, at most once per runtime);
//! 2. extract every attached document, in input order;
//! 3. resolve the prompt body (custom override, else the active template
//!    with request fields substituted);
//! 4. compose the user message (body, document section, closing sentence);
//! 5. send the fixed system persona plus that user message through the
//!    runtime, which re-resolves the route for this call.
//!
//! The completion text comes back untouched. Persisting it, interpreting it,
//! and moving the request between statuses belong to the caller.
//!
//! ERROR HANDLING
//! ==============
//! A missing provider stops the call before any document is read.
//! Per-document failures are already folded into inline markers by the
//! extractor. Provider errors propagate unchanged and are never retried here.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::error::ErrorCode;
use crate::llm::{ChatMessage, CompletionOptions, LlmError, ProviderRuntime};
use crate::services::extract::{self, display_name};
use crate::services::prompts::{PromptStore, PromptStoreError, substitute};

pub const SYSTEM_PROMPT: &str = "Você é um especialista em análise de projetos de infraestrutura rodoviária. \
                                 Forneça análises detalhadas e profissionais.";

pub const CLOSING_INSTRUCTION: &str = "Por favor, gere o relatório de análise conforme as instruções acima.";

pub const DOCUMENTS_HEADER: &str = "CONTEÚDO DOS DOCUMENTOS:";

/// Placeholder key filled with the attachment summary.
pub const ATTACHMENTS_KEY: &str = "arquivosInfo";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    /// Named request attributes substituted into the template.
    pub fields: BTreeMap<String, String>,
    /// Documents to extract, in the order they appear in the prompt.
    pub document_paths: Vec<PathBuf>,
    /// Used verbatim instead of the active template when non-empty.
    pub custom_prompt: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("no AI provider configured: set GROQ_API_KEY or OPENAI_API_KEY ({0})")]
    NoProviderConfigured(#[source] LlmError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Prompts(#[from] PromptStoreError),
}

impl ErrorCode for AnalysisError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoProviderConfigured(_) => "E_NO_PROVIDER",
            Self::Llm(e) => e.error_code(),
            Self::Prompts(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.retryable(),
            _ => false,
        }
    }
}

// =============================================================================
// PROMPT ASSEMBLY
// =============================================================================

/// Human-readable attachment count for the `{arquivosInfo}` placeholder.
#[must_use]
pub fn attachment_summary(count: usize) -> String {
    if count == 0 {
        "Nenhum documento foi anexado.".to_string()
    } else {
        format!("Foram anexados {count} documento(s) para análise.")
    }
}

/// Attachment summary split into files already on the request and files
/// sent with this analysis.
#[must_use]
pub fn reanalysis_summary(existing: usize, added: usize) -> String {
    let total = existing + added;
    if total == 0 {
        return attachment_summary(0);
    }
    let novos = if added > 0 { format!(" + {added} novos") } else { String::new() };
    format!("Foram anexados {total} documento(s) para análise ({existing} existentes{novos}).")
}

/// Delimiter line opening one document's text.
#[must_use]
pub fn document_delimiter(file_name: &str) -> String {
    format!("--- Conteúdo do arquivo {file_name} ---")
}

/// Join extracted texts, each under its delimiter line. Empty when there are
/// no documents.
#[must_use]
pub fn document_section(paths: &[PathBuf], texts: &[String]) -> String {
    paths
        .iter()
        .zip(texts)
        .map(|(path, text)| format!("{}\n{text}", document_delimiter(&display_name(path))))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[must_use]
pub fn compose_user_message(prompt_body: &str, documents: &str) -> String {
    let mut message = prompt_body.trim_end().to_string();
    if !documents.is_empty() {
        message.push_str("\n\n");
        message.push_str(DOCUMENTS_HEADER);
        message.push('\n');
        message.push_str(documents);
    }
    message.push_str("\n\n");
    message.push_str(CLOSING_INSTRUCTION);
    message
}

#[must_use]
pub fn build_messages(user_message: String) -> Vec<ChatMessage> {
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_message)]
}

/// Template variables: the request fields plus the attachment summary,
/// unless the caller already supplied one.
#[must_use]
pub fn template_variables(request: &AnalysisRequest) -> BTreeMap<String, String> {
    let mut vars = request.fields.clone();
    vars.entry(ATTACHMENTS_KEY.to_string())
        .or_insert_with(|| attachment_summary(request.document_paths.len()));
    vars
}

async fn resolve_prompt(prompts: &Arc<PromptStore>, request: &AnalysisRequest) -> Result<String, AnalysisError> {
    if let Some(custom) = request.custom_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        return Ok(custom.to_string());
    }
    let template = prompts.blocking(PromptStore::get_active).await?;
    Ok(substitute(&template.body, &template_variables(request)))
}

// =============================================================================
// ORCHESTRATION
// =============================================================================

/// Run one analysis and return the model's reply verbatim.
///
/// # Errors
///
/// [`AnalysisError::NoProviderConfigured`] when no provider can be
/// initialized (no network call is made), otherwise the adapter's
/// [`LlmError`] unchanged.
pub async fn analyze(
    runtime: &ProviderRuntime,
    prompts: &Arc<PromptStore>,
    request: AnalysisRequest,
) -> Result<String, AnalysisError> {
    runtime
        .ensure_initialized()
        .await
        .map_err(AnalysisError::NoProviderConfigured)?;

    let documents = if request.document_paths.is_empty() {
        String::new()
    } else {
        let texts = extract::extract_batch(&request.document_paths).await;
        document_section(&request.document_paths, &texts)
    };

    let prompt_body = resolve_prompt(prompts, &request).await?;
    let user_message = compose_user_message(&prompt_body, &documents);
    let prompt_len = user_message.len();

    let completion = runtime
        .complete(&build_messages(user_message), CompletionOptions::default())
        .await?;

    info!(
        provider = %completion.provider,
        model = %completion.model,
        documents = request.document_paths.len(),
        prompt_len,
        custom_prompt = request.custom_prompt.is_some(),
        "analysis: completed"
    );
    Ok(completion.content)
}

#[cfg(test)]
#[path = "analysis_test.rs"]
mod tests;
