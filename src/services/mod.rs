//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the analysis pipeline, prompt storage, and work-request
//! persistence so route handlers stay focused on protocol translation.

pub mod analysis;
pub mod extract;
pub mod prompts;
pub mod report;
pub mod solicitacao;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}
