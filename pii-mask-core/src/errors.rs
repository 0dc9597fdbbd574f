//! errors.rs - Error types for the pii-mask-core library.
//!
//! Each failure concern has its own enum so callers can react to it
//! programmatically; [`MaskError`] wraps them for the request path and maps
//! them onto transport status codes.
//!
//! License: MIT OR APACHE 2.0

use std::time::Duration;
use thiserror::Error;

/// User-correctable input problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text is required")]
    MissingText,

    #[error("text is too short (minimum {min} byte, got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("text is too long (maximum {max} bytes, got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

impl ValidationError {
    /// 422 for bodies that could not be parsed, 400 for everything else.
    pub fn status_code(&self) -> u16 {
        match self {
            ValidationError::MalformedBody(_) => 422,
            _ => 400,
        }
    }
}

/// Raised while building the pattern registry. Fatal: the process must not
/// start serving with a partially compiled registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternCompileError {
    #[error("pattern '{pattern}': {reason}")]
    Rejected { pattern: String, reason: String },

    #[error("failed to compile {} pattern(s):\n{}", .0.len(), join_errors(.0))]
    Multiple(Vec<PatternCompileError>),
}

impl PatternCompileError {
    pub fn rejected(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        PatternCompileError::Rejected {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Names of every pattern that failed to compile.
    pub fn offending_patterns(&self) -> Vec<&str> {
        match self {
            PatternCompileError::Rejected { pattern, .. } => vec![pattern.as_str()],
            PatternCompileError::Multiple(errors) => {
                errors.iter().flat_map(|e| e.offending_patterns()).collect()
            }
        }
    }
}

fn join_errors(errors: &[PatternCompileError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failures of the external tokenizer/NER engine or of the session pool in
/// front of it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("inference engine unavailable: {0}")]
    Unavailable(String),

    #[error("inference failed: {0}")]
    Failed(String),

    #[error("inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("inference queue is full ({0} requests waiting)")]
    Overloaded(usize),
}

/// The optional cache backend could not be reached. Never surfaced to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cache backend unavailable: {0}")]
pub struct CacheUnavailableError(pub String);

/// Top-level error for the masking pipeline.
///
/// `Clone` so a single-flight computation can hand the same failure to every
/// waiter.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum MaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    PatternCompile(#[from] PatternCompileError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("invalid span list: {0}")]
    InvalidSpans(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MaskError {
    /// HTTP status code a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            MaskError::Validation(e) => e.status_code(),
            MaskError::Inference(InferenceError::Overloaded(_)) => 503,
            _ => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_status_codes() {
        assert_eq!(ValidationError::MissingText.status_code(), 400);
        assert_eq!(ValidationError::TooLong { max: 1024, actual: 2000 }.status_code(), 400);
        assert_eq!(ValidationError::MalformedBody("eof".into()).status_code(), 422);
    }

    #[test]
    fn test_mask_error_status_codes() {
        assert_eq!(MaskError::from(ValidationError::MissingText).status_code(), 400);
        assert_eq!(MaskError::from(InferenceError::Failed("boom".into())).status_code(), 500);
        assert_eq!(MaskError::from(InferenceError::Overloaded(8)).status_code(), 503);
        assert_eq!(MaskError::Internal("x".into()).status_code(), 500);
        assert!(MaskError::from(ValidationError::MissingText).is_client_error());
    }

    #[test]
    fn test_multiple_compile_errors_name_every_pattern() {
        let err = PatternCompileError::Multiple(vec![
            PatternCompileError::rejected("phone_number", "unclosed group"),
            PatternCompileError::rejected("postal_code", "empty match"),
        ]);
        assert_eq!(err.offending_patterns(), vec!["phone_number", "postal_code"]);
        let text = err.to_string();
        assert!(text.contains("failed to compile 2 pattern(s)"));
        assert!(text.contains("pattern 'postal_code': empty match"));
    }
}
