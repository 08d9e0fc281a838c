//! Work-request routes, including the AI analysis trigger.
//!
//! DESIGN
//! ======
//! `POST /api/solicitacoes/{id}/analisar` owns the status transitions around
//! an analysis: the request moves to `em_analise` before the orchestrator
//! runs and stays there once a report is saved (pending human review). If
//! the orchestrator fails, the status goes back to `pendente` and the
//! response carries the provider's original message.
//!
//! The trigger accepts either a JSON body or a multipart form. PDFs sent in
//! the form are stored and appended to the request's attachments before the
//! analysis, and the attachment summary counts them separately.

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::Json;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ErrorCode};
use crate::routes::MAX_BODY_BYTES;
use crate::routes::uploads::{self, PendingUpload};
use crate::services::analysis::{self, ATTACHMENTS_KEY, AnalysisRequest};
use crate::services::report::Report;
use crate::services::solicitacao::{self, NewSolicitacao, Solicitacao, SolicitacaoError, SolicitacaoPatch, Status};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalisarBody {
    pub prompt_customizado: Option<String>,
}

pub(crate) fn solicitacao_error(err: SolicitacaoError) -> ApiError {
    match err {
        SolicitacaoError::NotFound(_) => ApiError::from_code(StatusCode::NOT_FOUND, "Solicitação não encontrada", &err),
        SolicitacaoError::Invalid(_) => ApiError::from_code(StatusCode::BAD_REQUEST, "Dados inválidos", &err),
        SolicitacaoError::Database(ref e) => {
            error!(error = %e, code = err.error_code(), "solicitacoes: database error");
            ApiError::from_code(StatusCode::INTERNAL_SERVER_ERROR, "Erro ao acessar solicitações", &err)
        }
    }
}

/// Body of the analysis trigger; absent or empty means no custom prompt.
///
/// # Errors
///
/// 400 when the body is present but not valid JSON.
pub(crate) fn parse_analisar_body(bytes: &[u8]) -> Result<AnalisarBody, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(AnalisarBody::default());
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
}

/// Inputs of one analysis trigger.
#[derive(Debug, Default)]
pub struct AnalisarInput {
    pub prompt_customizado: Option<String>,
    pub novos_pdfs: Vec<PendingUpload>,
}

/// Read the analysis trigger from a multipart form (`promptCustomizado`
/// text plus `novosPDFs` files) or from an optional JSON body.
///
/// # Errors
///
/// 400 for a malformed body or a non-PDF file.
pub(crate) async fn read_analisar_input(request: Request) -> Result<AnalisarInput, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if !is_multipart {
        let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read body: {e}")))?;
        let body = parse_analisar_body(&bytes)?;
        return Ok(AnalisarInput { prompt_customizado: body.prompt_customizado, novos_pdfs: Vec::new() });
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut input = AnalisarInput::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read multipart: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("promptCustomizado") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read promptCustomizado: {e}")))?;
                input.prompt_customizado = Some(text);
            }
            Some("novosPDFs") => {
                let upload = uploads::read_upload(
                    field,
                    uploads::pdf_extension,
                    "Apenas arquivos PDF são permitidos para análise",
                )
                .await?;
                input.novos_pdfs.push(upload);
            }
            _ => {}
        }
    }
    Ok(input)
}

/// `GET /api/solicitacoes` — newest first.
pub async fn list_solicitacoes(State(state): State<AppState>) -> Result<Json<Vec<Solicitacao>>, ApiError> {
    let rows = solicitacao::list(&state.pool).await.map_err(solicitacao_error)?;
    Ok(Json(rows))
}

/// `GET /api/solicitacoes/{id}`
pub async fn get_solicitacao(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Solicitacao>, ApiError> {
    let row = solicitacao::get(&state.pool, id).await.map_err(solicitacao_error)?;
    Ok(Json(row))
}

/// `POST /api/solicitacoes`
pub async fn create_solicitacao(
    State(state): State<AppState>,
    Json(body): Json<NewSolicitacao>,
) -> Result<(StatusCode, Json<Solicitacao>), ApiError> {
    let row = solicitacao::create(&state.pool, body).await.map_err(solicitacao_error)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PUT /api/solicitacoes/{id}` — partial update.
pub async fn update_solicitacao(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SolicitacaoPatch>,
) -> Result<Json<Solicitacao>, ApiError> {
    let row = solicitacao::update(&state.pool, id, patch).await.map_err(solicitacao_error)?;
    Ok(Json(row))
}

/// `DELETE /api/solicitacoes/{id}` — also removes attachment files.
pub async fn delete_solicitacao(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    solicitacao::delete(&state.pool, id, &state.uploads_dir)
        .await
        .map_err(solicitacao_error)?;
    Ok(Json(serde_json::json!({ "message": "Solicitação deletada com sucesso" })))
}

/// `POST /api/solicitacoes/{id}/analisar` — run the AI analysis and store
/// its report. New PDFs sent with the request are appended to `arquivos`
/// first and analyzed with the existing attachments.
pub async fn analisar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Request,
) -> Result<Json<Solicitacao>, ApiError> {
    let input = read_analisar_input(request).await?;
    let mut current = solicitacao::get(&state.pool, id).await.map_err(solicitacao_error)?;
    let existing = current.arquivos.len();

    if !input.novos_pdfs.is_empty() {
        let mut urls = Vec::with_capacity(input.novos_pdfs.len());
        for upload in &input.novos_pdfs {
            urls.push(uploads::store_upload(&state.uploads_dir, upload).await?);
        }
        current = solicitacao::append_arquivos(&state.pool, id, &urls)
            .await
            .map_err(solicitacao_error)?;
    }

    let mut fields = solicitacao::prompt_variables(&current);
    fields.insert(
        ATTACHMENTS_KEY.to_string(),
        analysis::reanalysis_summary(existing, input.novos_pdfs.len()),
    );
    let request = AnalysisRequest {
        fields,
        document_paths: solicitacao::document_paths(&state.uploads_dir, &current.arquivos),
        custom_prompt: input.prompt_customizado,
    };
    let documents = request.document_paths.len();

    solicitacao::set_status(&state.pool, id, Status::EmAnalise)
        .await
        .map_err(solicitacao_error)?;

    match analysis::analyze(&state.runtime, &state.prompts, request).await {
        Ok(report) => {
            let saved = solicitacao::save_report(&state.pool, id, &report)
                .await
                .map_err(solicitacao_error)?;
            info!(%id, documents, novos = input.novos_pdfs.len(), report_len = report.len(), "solicitacoes: analysis stored");
            Ok(Json(saved))
        }
        Err(e) => {
            error!(%id, error = %e, code = e.error_code(), "solicitacoes: analysis failed");
            if let Err(revert) = solicitacao::set_status(&state.pool, id, Status::Pendente).await {
                warn!(%id, error = %revert, "solicitacoes: status not reverted");
            }
            Err(ApiError::from_code(StatusCode::INTERNAL_SERVER_ERROR, "Erro ao analisar solicitação", &e))
        }
    }
}

/// `GET /api/solicitacoes/{id}/relatorio` — stored report, interpreted.
pub async fn relatorio(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, ApiError> {
    let row = solicitacao::get(&state.pool, id).await.map_err(solicitacao_error)?;
    row.relatorio_ia
        .as_deref()
        .map(|content| Json(Report::parse(content)))
        .ok_or_else(|| ApiError::not_found("Relatório ainda não gerado"))
}

#[cfg(test)]
#[path = "solicitacoes_test.rs"]
mod tests;
