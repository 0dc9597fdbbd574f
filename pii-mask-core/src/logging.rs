//! logging.rs - Helpers that keep PII out of log output.
//!
//! Matched substrings, entity text and request bodies are only ever logged
//! through [`get_loggable_content`], which redacts them unless
//! `PII_MASK_ALLOW_DEBUG_PII=true` is set in the environment of the process.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use once_cell::sync::Lazy;

/// Read once; changing the variable after the first log call has no effect.
static PII_DEBUG_ALLOWED: Lazy<bool> = Lazy::new(|| {
    std::env::var("PII_MASK_ALLOW_DEBUG_PII")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
});

/// Replaces sensitive text with a placeholder that only reveals its length.
pub fn redact_sensitive(s: &str) -> String {
    const MAX_LEN: usize = 8;
    let chars = s.chars().count();
    if chars <= MAX_LEN {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED: {} chars]", chars)
    }
}

pub fn get_loggable_content(sensitive_content: &str) -> String {
    if *PII_DEBUG_ALLOWED {
        sensitive_content.to_string()
    } else {
        redact_sensitive(sensitive_content)
    }
}

/// Logs a detected entity without leaking its text.
pub fn log_entity_debug(module_path: &str, label: &str, text: &str, start: usize, end: usize) {
    debug!(
        "{} Found entity: Label='{}', Text='{}', Range=[{}, {})",
        module_path,
        label,
        get_loggable_content(text),
        start,
        end
    );
}
