//! Process configuration read at startup.
//!
//! Values come from the environment (after `.env` is loaded). LLM settings
//! are resolved separately by [`crate::llm::config`], per call.

use std::path::PathBuf;

use crate::llm::EnvLookup;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_PROMPTS_FILE: &str = "config/prompts.json";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} required")]
    Missing(&'static str),
    #[error("invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub prompts_file: PathBuf,
    pub uploads_dir: PathBuf,
    pub db_max_connections: u32,
}

impl AppConfig {
    /// # Errors
    ///
    /// [`ConfigError`] when `DATABASE_URL` is missing or a number is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&crate::llm::config::process_env)
    }

    /// # Errors
    ///
    /// [`ConfigError`] when `DATABASE_URL` is missing or a number is malformed.
    pub fn from_lookup(lookup: &EnvLookup) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let db_max_connections = parse_or(get("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;

        Ok(Self {
            port,
            database_url,
            prompts_file: get("PROMPTS_FILE").map_or_else(|| PathBuf::from(DEFAULT_PROMPTS_FILE), PathBuf::from),
            uploads_dir: get("UPLOADS_DIR").map_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR), PathBuf::from),
            db_max_connections,
        })
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
