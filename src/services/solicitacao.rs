//! Work-request service — CRUD over the `solicitacoes` table.
//!
//! DESIGN
//! ======
//! A work request carries four required descriptive fields, a status, the
//! upload URLs of its attachments, and a bag of optional overview fields
//! (`campos`, stored as JSONB). The API serializes it in the camelCase shape
//! the web client already consumes, with the overview fields flattened to
//! the top level.
//!
//! Attachments are stored as `/uploads/<file>` URLs; [`upload_path`] maps
//! one back to a file inside the uploads directory by base name only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::now_ms;

/// Optional overview fields, in form order.
pub const OVERVIEW_FIELDS: [&str; 14] = [
    "cliente",
    "kilometragem",
    "nroProcessoErp",
    "rodovia",
    "nomeConcessionaria",
    "sentido",
    "ocupacao",
    "municipioEstado",
    "ocupacaoArea",
    "responsavelTecnico",
    "faseProjeto",
    "analistaResponsavel",
    "memorial",
    "dataRecebimento",
];

/// Template value for an overview field that was never filled in.
pub const NOT_INFORMED: &str = "não informado";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SolicitacaoError {
    #[error("work request not found: {0}")]
    NotFound(Uuid),
    #[error("invalid work request: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for SolicitacaoError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_SOLICITACAO_NOT_FOUND",
            Self::Invalid(_) => "E_INVALID",
            Self::Database(_) => "E_DATABASE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pendente,
    EmAnalise,
    Aprovada,
    Rejeitada,
}

impl Status {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pendente => "pendente",
            Self::EmAnalise => "em_analise",
            Self::Aprovada => "aprovada",
            Self::Rejeitada => "rejeitada",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pendente" => Some(Self::Pendente),
            "em_analise" => Some(Self::EmAnalise),
            "aprovada" => Some(Self::Aprovada),
            "rejeitada" => Some(Self::Rejeitada),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Solicitacao {
    pub id: Uuid,
    pub titulo: String,
    pub tipo_obra: String,
    pub localizacao: String,
    pub descricao: String,
    pub status: Status,
    pub arquivos: Vec<String>,
    #[serde(flatten)]
    pub campos: BTreeMap<String, String>,
    #[serde(rename = "relatorioIA")]
    pub relatorio_ia: Option<String>,
    #[serde(rename = "analisadoPorIA")]
    pub analisado_por_ia: bool,
    pub analisado_em: Option<i64>,
    pub created_by: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Body accepted by `create`. Overview fields arrive at the top level.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSolicitacao {
    #[serde(default)]
    pub titulo: String,
    #[serde(default)]
    pub tipo_obra: String,
    #[serde(default)]
    pub localizacao: String,
    #[serde(default)]
    pub descricao: String,
    pub status: Option<String>,
    pub created_by: Option<String>,
    #[serde(default)]
    pub arquivos: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Partial update. Empty strings leave the stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolicitacaoPatch {
    pub titulo: Option<String>,
    pub tipo_obra: Option<String>,
    pub localizacao: Option<String>,
    pub descricao: Option<String>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(sqlx::FromRow)]
struct SolicitacaoRow {
    id: Uuid,
    titulo: String,
    tipo_obra: String,
    localizacao: String,
    descricao: String,
    status: String,
    arquivos: Json<Vec<String>>,
    campos: Json<BTreeMap<String, String>>,
    relatorio_ia: Option<String>,
    analisado_por_ia: bool,
    analisado_em: Option<i64>,
    created_by: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl From<SolicitacaoRow> for Solicitacao {
    fn from(row: SolicitacaoRow) -> Self {
        Self {
            id: row.id,
            titulo: row.titulo,
            tipo_obra: row.tipo_obra,
            localizacao: row.localizacao,
            descricao: row.descricao,
            status: Status::parse(&row.status).unwrap_or(Status::Pendente),
            arquivos: row.arquivos.0,
            campos: row.campos.0,
            relatorio_ia: row.relatorio_ia,
            analisado_por_ia: row.analisado_por_ia,
            analisado_em: row.analisado_em,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, titulo, tipo_obra, localizacao, descricao, status, arquivos, campos, \
                       relatorio_ia, analisado_por_ia, analisado_em, created_by, created_at, updated_at";

// =============================================================================
// FIELD HELPERS
// =============================================================================

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Known overview fields with a non-empty string value.
#[must_use]
pub fn overview_fields(extra: &BTreeMap<String, serde_json::Value>) -> BTreeMap<String, String> {
    OVERVIEW_FIELDS
        .iter()
        .filter_map(|key| {
            let value = non_empty(extra.get(*key).and_then(serde_json::Value::as_str))?;
            Some(((*key).to_string(), value))
        })
        .collect()
}

fn parse_status(raw: Option<&str>) -> Result<Option<Status>, SolicitacaoError> {
    match non_empty(raw) {
        None => Ok(None),
        Some(s) => Status::parse(&s)
            .map(Some)
            .ok_or_else(|| SolicitacaoError::Invalid(format!("unknown status '{s}'"))),
    }
}

impl NewSolicitacao {
    /// Check required fields and the optional initial status.
    ///
    /// # Errors
    ///
    /// [`SolicitacaoError::Invalid`] naming the missing fields.
    pub fn validate(&self) -> Result<Status, SolicitacaoError> {
        let missing: Vec<&str> = [
            ("titulo", &self.titulo),
            ("tipoObra", &self.tipo_obra),
            ("localizacao", &self.localizacao),
            ("descricao", &self.descricao),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect();

        if !missing.is_empty() {
            return Err(SolicitacaoError::Invalid(format!("required fields missing: {}", missing.join(", "))));
        }
        Ok(parse_status(self.status.as_deref())?.unwrap_or(Status::Pendente))
    }
}

/// Template variables for one request: the four core fields plus every
/// overview field, unfilled ones as [`NOT_INFORMED`].
#[must_use]
pub fn prompt_variables(s: &Solicitacao) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("titulo".to_string(), s.titulo.clone());
    vars.insert("tipoObra".to_string(), s.tipo_obra.clone());
    vars.insert("localizacao".to_string(), s.localizacao.clone());
    vars.insert("descricao".to_string(), s.descricao.clone());
    for key in OVERVIEW_FIELDS {
        let value = s
            .campos
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| NOT_INFORMED.to_string());
        vars.insert(key.to_string(), value);
    }
    vars
}

/// Map an `/uploads/<file>` URL to its file under `uploads_dir`.
///
/// Only the last path segment is used, so a stored URL cannot point outside
/// the uploads directory.
#[must_use]
pub fn upload_path(uploads_dir: &Path, url: &str) -> Option<PathBuf> {
    let name = url.rsplit('/').next()?.trim();
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return None;
    }
    Some(uploads_dir.join(name))
}

/// Existing attachment files for `arquivos`, in stored order.
#[must_use]
pub fn document_paths(uploads_dir: &Path, arquivos: &[String]) -> Vec<PathBuf> {
    arquivos
        .iter()
        .filter_map(|url| upload_path(uploads_dir, url))
        .filter(|path| path.is_file())
        .collect()
}

// =============================================================================
// CRUD
// =============================================================================

/// Insert a new work request.
///
/// # Errors
///
/// [`SolicitacaoError::Invalid`] when required fields are missing, or a
/// database error.
pub async fn create(pool: &PgPool, new: NewSolicitacao) -> Result<Solicitacao, SolicitacaoError> {
    let status = new.validate()?;
    let id = Uuid::new_v4();
    let now = now_ms();
    let campos = overview_fields(&new.extra);

    let row = sqlx::query_as::<_, SolicitacaoRow>(&format!(
        "INSERT INTO solicitacoes
            (id, titulo, tipo_obra, localizacao, descricao, status, arquivos, campos, created_by, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(new.titulo.trim())
    .bind(new.tipo_obra.trim())
    .bind(new.localizacao.trim())
    .bind(new.descricao.trim())
    .bind(status.as_str())
    .bind(Json(&new.arquivos))
    .bind(Json(&campos))
    .bind(non_empty(new.created_by.as_deref()))
    .bind(now)
    .fetch_one(pool)
    .await?;

    info!(%id, arquivos = new.arquivos.len(), "solicitacao: created");
    Ok(row.into())
}

/// All work requests, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(pool: &PgPool) -> Result<Vec<Solicitacao>, SolicitacaoError> {
    let rows = sqlx::query_as::<_, SolicitacaoRow>(&format!(
        "SELECT {COLUMNS} FROM solicitacoes ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// # Errors
///
/// [`SolicitacaoError::NotFound`] or a database error.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<Solicitacao, SolicitacaoError> {
    sqlx::query_as::<_, SolicitacaoRow>(&format!("SELECT {COLUMNS} FROM solicitacoes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Into::into)
        .ok_or(SolicitacaoError::NotFound(id))
}

/// Apply a partial update; only non-empty fields overwrite.
///
/// # Errors
///
/// [`SolicitacaoError::NotFound`], [`SolicitacaoError::Invalid`] for an
/// unknown status, or a database error.
pub async fn update(pool: &PgPool, id: Uuid, patch: SolicitacaoPatch) -> Result<Solicitacao, SolicitacaoError> {
    let status = parse_status(patch.status.as_deref())?;
    let campos = overview_fields(&patch.extra);

    sqlx::query_as::<_, SolicitacaoRow>(&format!(
        "UPDATE solicitacoes SET
            titulo = COALESCE($2, titulo),
            tipo_obra = COALESCE($3, tipo_obra),
            localizacao = COALESCE($4, localizacao),
            descricao = COALESCE($5, descricao),
            status = COALESCE($6, status),
            campos = campos || $7,
            updated_at = $8
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(non_empty(patch.titulo.as_deref()))
    .bind(non_empty(patch.tipo_obra.as_deref()))
    .bind(non_empty(patch.localizacao.as_deref()))
    .bind(non_empty(patch.descricao.as_deref()))
    .bind(status.map(Status::as_str))
    .bind(Json(&campos))
    .bind(now_ms())
    .fetch_optional(pool)
    .await?
    .map(Into::into)
    .ok_or(SolicitacaoError::NotFound(id))
}

/// # Errors
///
/// [`SolicitacaoError::NotFound`] or a database error.
pub async fn set_status(pool: &PgPool, id: Uuid, status: Status) -> Result<(), SolicitacaoError> {
    let result = sqlx::query("UPDATE solicitacoes SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .bind(now_ms())
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(SolicitacaoError::NotFound(id));
    }
    Ok(())
}

/// Append attachment URLs to the end of `arquivos`.
///
/// # Errors
///
/// [`SolicitacaoError::NotFound`] or a database error.
pub async fn append_arquivos(pool: &PgPool, id: Uuid, urls: &[String]) -> Result<Solicitacao, SolicitacaoError> {
    let row = sqlx::query_as::<_, SolicitacaoRow>(&format!(
        "UPDATE solicitacoes SET arquivos = arquivos || $2, updated_at = $3 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(Json(urls))
    .bind(now_ms())
    .fetch_optional(pool)
    .await?
    .ok_or(SolicitacaoError::NotFound(id))?;

    info!(%id, added = urls.len(), "solicitacao: attachments appended");
    Ok(row.into())
}

/// Store an analysis report. The request stays `em_analise` for human review.
///
/// # Errors
///
/// [`SolicitacaoError::NotFound`] or a database error.
pub async fn save_report(pool: &PgPool, id: Uuid, report: &str) -> Result<Solicitacao, SolicitacaoError> {
    let now = now_ms();
    sqlx::query_as::<_, SolicitacaoRow>(&format!(
        "UPDATE solicitacoes SET
            relatorio_ia = $2,
            analisado_por_ia = TRUE,
            analisado_em = $3,
            status = $4,
            updated_at = $3
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(report)
    .bind(now)
    .bind(Status::EmAnalise.as_str())
    .fetch_optional(pool)
    .await?
    .map(Into::into)
    .ok_or(SolicitacaoError::NotFound(id))
}

/// Delete a work request and its attachment files. Missing files are ignored.
///
/// # Errors
///
/// [`SolicitacaoError::NotFound`] or a database error.
pub async fn delete(pool: &PgPool, id: Uuid, uploads_dir: &Path) -> Result<(), SolicitacaoError> {
    let arquivos = sqlx::query_scalar::<_, Json<Vec<String>>>("DELETE FROM solicitacoes WHERE id = $1 RETURNING arquivos")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(SolicitacaoError::NotFound(id))?;

    for path in arquivos.0.iter().filter_map(|url| upload_path(uploads_dir, url)) {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "solicitacao: attachment not removed"),
        }
    }

    info!(%id, "solicitacao: deleted");
    Ok(())
}

#[cfg(test)]
#[path = "solicitacao_test.rs"]
mod tests;
