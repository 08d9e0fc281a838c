//! Attachment upload route.
//!
//! Files are written to the uploads directory under a generated name
//! (`<epoch ms>-<uuid><ext>`) and returned as `/uploads/<name>` URLs, which
//! clients then store in a work request's `arquivos`.

use std::path::Path;

use axum::body::Bytes;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::now_ms;
use crate::state::AppState;

/// Accepted attachment extensions (lowercase, without the dot).
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["pdf", "jpg", "jpeg", "png", "xlsx"];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub arquivos: Vec<String>,
}

/// Lowercased extension of `file_name` if it is an accepted attachment type.
#[must_use]
pub fn allowed_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Lowercased extension of `file_name` if it is a PDF.
#[must_use]
pub fn pdf_extension(file_name: &str) -> Option<String> {
    allowed_extension(file_name).filter(|ext| ext == "pdf")
}

#[must_use]
pub fn stored_name(ext: &str) -> String {
    format!("{}-{}.{ext}", now_ms(), Uuid::new_v4().simple())
}

/// A file read from a multipart field, not yet written to disk.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub original: String,
    pub ext: String,
    pub data: Bytes,
}

/// Read one file field, checking its name with `accept`.
///
/// # Errors
///
/// 400 with `rejection` when the extension is not accepted, or when the
/// field body cannot be read.
pub async fn read_upload(
    field: Field<'_>,
    accept: fn(&str) -> Option<String>,
    rejection: &str,
) -> Result<PendingUpload, ApiError> {
    let original = field.file_name().unwrap_or_default().to_string();
    let Some(ext) = accept(&original) else {
        return Err(ApiError::bad_request(format!("{rejection}: {original}")));
    };
    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read file: {e}")))?;
    Ok(PendingUpload { original, ext, data })
}

/// Write `upload` under a generated name and return its `/uploads/` URL.
///
/// # Errors
///
/// 500 when the uploads directory or the file cannot be written.
pub async fn store_upload(uploads_dir: &Path, upload: &PendingUpload) -> Result<String, ApiError> {
    tokio::fs::create_dir_all(uploads_dir).await.map_err(|e| {
        warn!(error = %e, "uploads: directory unavailable");
        ApiError::internal("Erro ao salvar arquivo")
    })?;

    let name = stored_name(&upload.ext);
    tokio::fs::write(uploads_dir.join(&name), &upload.data).await.map_err(|e| {
        warn!(file = %name, error = %e, "uploads: write failed");
        ApiError::internal("Erro ao salvar arquivo")
    })?;
    info!(file = %name, original = %upload.original, bytes = upload.data.len(), "uploads: stored");
    Ok(format!("/uploads/{name}"))
}

/// `POST /api/uploads` — multipart form, one or more `files` fields.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut arquivos = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to read multipart: {e}")))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let upload = read_upload(field, allowed_extension, "Tipo de arquivo não permitido").await?;
        arquivos.push(store_upload(&state.uploads_dir, &upload).await?);
    }

    if arquivos.is_empty() {
        return Err(ApiError::bad_request("Nenhum arquivo enviado"));
    }
    Ok((StatusCode::CREATED, Json(UploadResponse { arquivos })))
}

#[cfg(test)]
#[path = "uploads_test.rs"]
mod tests;
