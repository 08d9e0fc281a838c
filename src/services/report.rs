//! Report interpretation — checklist JSON or free-form narrative.
//!
//! The analysis pipeline stores the model's reply verbatim. This module
//! decides how the HTTP layer presents it: a JSON object carrying known
//! checklist keys becomes ordered checklist rows, anything else is narrative.

use serde::Serialize;

/// Checklist keys in presentation order, with their row labels.
pub const CHECKLIST_ITEMS: [(&str, &str); 20] = [
    ("LOCALIZACAO", "Localização do acesso conforme SRE vigente"),
    ("KM_INICIO", "KM+M do início (eixo do acesso)"),
    ("KM_FIM", "KM+M do final (eixo do acesso)"),
    ("NOME_BR", "Identificação da BR"),
    ("COORDENADAS_GEORREFERENCIAIS_E", "Coordenadas georreferenciais (E)"),
    ("COORDENADAS_GEORREFERENCIAIS_N", "Coordenadas georreferenciais (N)"),
    ("TRACADO_FAIXA_DOMINIO", "Traçado em faixa de domínio"),
    ("COTAS_TEXTOS_LEGIVEIS", "Cotas e textos legíveis"),
    ("VERIFICACAO_ESCALA", "Verificação de escala"),
    ("MEMORIAL", "Memorial descritivo"),
    ("LARGURA_PISTA_DNIT", "Largura de pista (padrão DNIT)"),
    ("LEGENDAS", "Legendação"),
    ("ANOTACAO_NOTA", "Anotação / Nota"),
    ("SIGLA_ABREVIACAO", "Siglas e abreviações"),
    ("LOC_KM_PREFIXO", "Localização km + prefixo"),
    ("CARIMBO_CORRETO", "Carimbo correto"),
    ("LIMITE_PROPRIEDADE", "Limite de propriedade"),
    ("DELIMITACAO_DOMINIO_NAO_EDIFICANTE", "Delimitação domínio não edificante"),
    ("ART_PDF", "ART em PDF"),
    ("QTD_FOLHAS", "Quantidade de folhas"),
];

const APPROVED_VALUES: [&str; 5] = ["aprovado", "conforme", "ok", "sim", "presente"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistRow {
    pub item: usize,
    pub key: &'static str,
    pub label: &'static str,
    pub status: String,
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "lowercase")]
pub enum Report {
    Checklist(Vec<ChecklistRow>),
    Narrative(String),
}

impl Report {
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let Some(object) = json_object(content) else {
            return Self::Narrative(content.to_string());
        };

        let rows: Vec<ChecklistRow> = CHECKLIST_ITEMS
            .iter()
            .filter_map(|(key, label)| object.get(*key).map(|v| (*key, *label, v)))
            .enumerate()
            .map(|(index, (key, label, value))| {
                let value = value_text(value);
                let approved = is_approved(&value);
                let status = if approved {
                    "Aprovado".to_string()
                } else if value.is_empty() {
                    "—".to_string()
                } else {
                    value
                };
                ChecklistRow { item: index + 1, key, label, status, approved }
            })
            .collect();

        if rows.is_empty() {
            Self::Narrative(content.to_string())
        } else {
            Self::Checklist(rows)
        }
    }

    #[must_use]
    pub fn is_checklist(&self) -> bool {
        matches!(self, Self::Checklist(_))
    }
}

#[must_use]
pub fn is_approved(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    APPROVED_VALUES.contains(&v.as_str())
}

fn json_object(content: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_str(strip_fence(content)).ok()? {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}

fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
