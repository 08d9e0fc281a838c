//! Document text extraction for analysis prompts.
//!
//! DESIGN
//! ======
//! Classification is by file name only: a case-insensitive `.pdf` suffix gets
//! binary text extraction, anything else becomes a "referenced, not parsed"
//! marker. PDF parsing runs on the blocking pool; a panic inside the parser
//! surfaces as a join error and is reported like any other unreadable file.
//!
//! ERROR HANDLING
//! ==============
//! [`extract_text`] fails per file. [`extract_batch`] never fails: a bad file
//! turns into an inline error marker in its own slot and the rest of the batch
//! is unaffected. Messages name the file's base name only, never its path.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("could not process the PDF: {file_name}")]
    Unreadable {
        file_name: String,
        #[source]
        source: BoxError,
    },
}

impl crate::error::ErrorCode for DocumentError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unreadable { .. } => "E_DOCUMENT_UNREADABLE",
        }
    }
}

/// Base name used in markers and messages.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "documento".to_string())
}

#[must_use]
pub fn is_pdf(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().ends_with(".pdf"))
        .unwrap_or(false)
}

/// Marker for files that are attached but not parsed.
#[must_use]
pub fn reference_marker(file_name: &str) -> String {
    format!("[Arquivo {file_name} não é PDF; incluído apenas como referência]")
}

/// Marker for files whose extraction failed.
#[must_use]
pub fn error_marker(file_name: &str) -> String {
    format!("[Erro ao processar arquivo {file_name}]")
}

/// Extract the text of one document.
///
/// # Errors
///
/// Returns [`DocumentError::Unreadable`] when a PDF cannot be read or parsed.
pub async fn extract_text(path: &Path) -> Result<String, DocumentError> {
    let file_name = display_name(path);
    if !is_pdf(path) {
        return Ok(reference_marker(&file_name));
    }

    let unreadable = |source: BoxError| DocumentError::Unreadable { file_name: file_name.clone(), source };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| unreadable(Box::new(e)))?;
    let byte_len = bytes.len();

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string()))
        .await
        .map_err(|e| unreadable(Box::new(e)))?
        .map_err(|e| unreadable(e.into()))?;

    info!(file = %file_name, byte_len, text_len = text.len(), "extract: pdf text extracted");
    Ok(text.trim().to_string())
}

/// Extract every path, preserving input order one-to-one.
///
/// Files are processed concurrently; `join_all` yields results in input
/// order regardless of completion order.
pub async fn extract_batch(paths: &[PathBuf]) -> Vec<String> {
    join_all(paths.iter().map(|path| async move {
        match extract_text(path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, cause = ?std::error::Error::source(&e), "extract: file skipped");
                error_marker(&display_name(path))
            }
        }
    }))
    .await
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
