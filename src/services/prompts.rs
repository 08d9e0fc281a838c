//! Prompt template store — named prompt skeletons persisted as a JSON file.
//!
//! DESIGN
//! ======
//! The backing file is a pretty-printed JSON array that operators edit by
//! hand, so field names follow the persisted form (`nome`, `descricao`,
//! `prompt`, `ativo`). Reads take a shared lock, writes take the exclusive
//! lock and replace the file atomically (temp file in the same directory,
//! fsync, rename), so a reader never sees a half-written collection.
//!
//! All file access is blocking; async callers go through
//! [`PromptStore::blocking`].
//!
//! ERROR HANDLING
//! ==============
//! A missing, unreadable or malformed file is not an error: [`load_all`]
//! falls back to the built-in default template. Only writes fail, with
//! [`PromptStoreError::Persistence`], and they fail before the live file is
//! touched.
//!
//! [`load_all`]: PromptStore::load_all

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "prompt")]
    pub body: String,
    #[serde(rename = "ativo", default)]
    pub active: bool,
}

/// Fields accepted when creating a template.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPrompt {
    pub id: Option<String>,
    #[serde(rename = "nome", default)]
    pub name: String,
    #[serde(rename = "descricao", default)]
    pub description: String,
    #[serde(rename = "prompt", default)]
    pub body: String,
    #[serde(rename = "ativo", default)]
    pub active: Option<bool>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptPatch {
    #[serde(rename = "nome")]
    pub name: Option<String>,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    #[serde(rename = "prompt")]
    pub body: Option<String>,
    #[serde(rename = "ativo")]
    pub active: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum PromptStoreError {
    #[error("failed to persist prompt templates to {path}: {source}")]
    Persistence {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("prompt store worker failed: {0}")]
    Worker(String),
}

impl crate::error::ErrorCode for PromptStoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Persistence { .. } => "E_PROMPT_PERSISTENCE",
            Self::Worker(_) => "E_INTERNAL",
        }
    }
}

// =============================================================================
// DEFAULT TEMPLATE
// =============================================================================

pub const DEFAULT_TEMPLATE_ID: &str = "default";

const DEFAULT_TEMPLATE_BODY: &str = r#"Você é um analista de projetos de infraestrutura rodoviária. Analise a solicitação e os documentos (PDFs) anexados e preencha o checklist de verificação.

INFORMAÇÕES DA SOLICITAÇÃO:
- Título: {titulo}
- Tipo de Obra: {tipoObra}
- Localização: {localizacao}
- Descrição: {descricao}

DOCUMENTOS ANEXADOS:
{arquivosInfo}

INSTRUÇÕES:
1. Extraia e valide as informações dos documentos/plantas.
2. Para cada item do checklist, indique conformidade ou preencha com o valor encontrado (texto ou número conforme o campo).
3. Retorne APENAS um objeto JSON válido, sem alterar os nomes dos campos. Use exatamente as chaves abaixo. Para itens conformes use o valor "Aprovado". Para não conformidades use "Não conformidade" ou descreva. Para dados (KM, BR, coordenadas) preencha com o valor encontrado.

FORMATO DE SAÍDA - OBJETO JSON (use exatamente estes nomes de campos):
{
  "LOCALIZACAO": "texto ou descrição",
  "KM_INICIO": "valor ou texto",
  "KM_FIM": "valor ou texto",
  "NOME_BR": "nome da BR",
  "COORDENADAS_GEORREFERENCIAIS_E": "valor",
  "COORDENADAS_GEORREFERENCIAIS_N": "valor",
  "TRACADO_FAIXA_DOMINIO": "conforme/não conforme ou observação",
  "COTAS_TEXTOS_LEGIVEIS": "conforme/não conforme ou observação",
  "VERIFICACAO_ESCALA": "conforme/não conforme ou observação",
  "MEMORIAL": "conforme/não conforme ou observação",
  "LARGURA_PISTA_DNIT": "valor ou observação",
  "LEGENDAS": "conforme/não conforme ou observação",
  "ANOTACAO_NOTA": "conforme/não conforme ou observação",
  "SIGLA_ABREVIACAO": "conforme/não conforme ou observação",
  "LOC_KM_PREFIXO": "conforme/não conforme ou observação",
  "CARIMBO_CORRETO": "conforme/não conforme ou observação",
  "LIMITE_PROPRIEDADE": "conforme/não conforme ou observação",
  "DELIMITACAO_DOMINIO_NAO_EDIFICANTE": "conforme/não conforme ou observação",
  "ART_PDF": "conforme/não conforme ou observação",
  "QTD_FOLHAS": "número ou texto"
}

Responda somente com o JSON, sem texto antes ou depois. Se algum dado não estiver disponível no documento, use "não informado" ou "não aplicável" no valor."#;

/// Built-in template used when the store holds no active template.
#[must_use]
pub fn default_template() -> PromptTemplate {
    PromptTemplate {
        id: DEFAULT_TEMPLATE_ID.into(),
        name: "Checklist de Verificação de Projeto".into(),
        description: "Checklist padrão de conformidade para solicitações de obras rodoviárias".into(),
        body: DEFAULT_TEMPLATE_BODY.into(),
        active: true,
    }
}

// =============================================================================
// SUBSTITUTION
// =============================================================================

/// Replace every `{key}` with its value. Keys absent from `variables` stay
/// verbatim in the output.
///
/// Matching is literal and case-sensitive; replacement values are not
/// rescanned for placeholders.
#[must_use]
pub fn substitute(template: &str, variables: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after
            .find(['{', '}'])
            .filter(|&end| after.as_bytes()[end] == b'}')
            .and_then(|end| variables.get(&after[..end]).map(|v| (v, end)));

        match replacement {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

// =============================================================================
// STORE
// =============================================================================

pub struct PromptStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl PromptStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: RwLock::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a store operation on the blocking pool.
    ///
    /// # Errors
    ///
    /// [`PromptStoreError::Worker`] if the blocking task panics.
    pub async fn blocking<T, F>(self: &Arc<Self>, op: F) -> Result<T, PromptStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&PromptStore) -> T + Send + 'static,
    {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| PromptStoreError::Worker(e.to_string()))
    }

    /// All stored templates, or the built-in default when the file is
    /// missing or cannot be parsed.
    #[must_use]
    pub fn load_all(&self) -> Vec<PromptTemplate> {
        let _guard = self.lock.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.read_file()
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<PromptTemplate> {
        self.load_all().into_iter().find(|p| p.id == id)
    }

    /// First template flagged active, else the built-in default.
    #[must_use]
    pub fn get_active(&self) -> PromptTemplate {
        self.load_all()
            .into_iter()
            .find(|p| p.active)
            .unwrap_or_else(default_template)
    }

    /// Replace the whole collection.
    ///
    /// # Errors
    ///
    /// [`PromptStoreError::Persistence`] when the directory or file cannot be
    /// written; the previous file is left intact.
    pub fn save_all(&self, templates: &[PromptTemplate]) -> Result<(), PromptStoreError> {
        let _guard = self.lock.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.write_file(templates)
    }

    /// Append a template. A missing id becomes `prompt-<epoch ms>`; `active`
    /// defaults to false.
    ///
    /// # Errors
    ///
    /// [`PromptStoreError::Persistence`] when the save fails.
    pub fn create(&self, new: NewPrompt) -> Result<PromptTemplate, PromptStoreError> {
        let _guard = self.lock.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut templates = self.read_file();

        let template = PromptTemplate {
            id: new
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("prompt-{}", crate::services::now_ms())),
            name: new.name,
            description: new.description,
            body: new.body,
            active: new.active.unwrap_or(false),
        };
        templates.push(template.clone());
        self.write_file(&templates)?;

        info!(id = %template.id, "prompts: template created");
        Ok(template)
    }

    /// Merge `patch` into the template with `id`. The id never changes.
    /// Returns `None` when no template has that id.
    ///
    /// # Errors
    ///
    /// [`PromptStoreError::Persistence`] when the save fails.
    pub fn update(&self, id: &str, patch: PromptPatch) -> Result<Option<PromptTemplate>, PromptStoreError> {
        let _guard = self.lock.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut templates = self.read_file();

        let Some(template) = templates.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            template.name = name;
        }
        if let Some(description) = patch.description {
            template.description = description;
        }
        if let Some(body) = patch.body {
            template.body = body;
        }
        if let Some(active) = patch.active {
            template.active = active;
        }
        let updated = template.clone();
        self.write_file(&templates)?;

        info!(id = %updated.id, "prompts: template updated");
        Ok(Some(updated))
    }

    // Callers hold the lock.
    fn read_file(&self) -> Vec<PromptTemplate> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return vec![default_template()],
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "prompts: store unreadable, using default");
                return vec![default_template()];
            }
        };
        match serde_json::from_str(&raw) {
            Ok(templates) => templates,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "prompts: store malformed, using default");
                vec![default_template()]
            }
        }
    }

    fn write_file(&self, templates: &[PromptTemplate]) -> Result<(), PromptStoreError> {
        let persistence = |source| PromptStoreError::Persistence { path: self.path.display().to_string(), source };

        let json = serde_json::to_string_pretty(templates).map_err(|e| persistence(std::io::Error::other(e)))?;
        write_atomic(&self.path, json.as_bytes()).map_err(persistence)?;

        info!(path = %self.path.display(), count = templates.len(), "prompts: store saved");
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
#[path = "prompts_test.rs"]
mod tests;
