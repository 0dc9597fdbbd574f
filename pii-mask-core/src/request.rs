//! request.rs - Request parsing, validation, normalization and wire types.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};

use crate::config::InputLimits;
use crate::consolidate::EntityReport;
use crate::errors::{MaskError, ValidationError};
use crate::result::MaskedResult;

/// Body of a masking request. `text` is optional here so that a missing or
/// null field is reported as a validation error rather than a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MaskRequest {
    #[serde(default)]
    pub text: Option<String>,
}

impl MaskRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// Malformed JSON and wrong field types are `MalformedBody` (422).
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
    }

    /// Checks the text and returns its normalized form.
    pub fn validate(&self, limits: &InputLimits) -> Result<String, ValidationError> {
        let text = self.text.as_deref().ok_or(ValidationError::MissingText)?;
        validate_text(text, limits)
    }
}

/// Applies the byte-length bounds to `text` as received, then normalizes it.
/// Text that is blank after normalization counts as missing.
pub fn validate_text(text: &str, limits: &InputLimits) -> Result<String, ValidationError> {
    let actual = text.len();
    if actual < limits.min_bytes {
        return Err(ValidationError::TooShort {
            min: limits.min_bytes,
            actual,
        });
    }
    if actual > limits.max_bytes {
        return Err(ValidationError::TooLong {
            max: limits.max_bytes,
            actual,
        });
    }

    let normalized = normalize(text);
    if normalized.trim().is_empty() {
        return Err(ValidationError::MissingText);
    }
    Ok(normalized)
}

/// Converts CRLF and lone CR to LF, then strips ANSI escape sequences.
/// Line endings go first: the escape stripper drops bare carriage returns.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    strip_ansi_escapes::strip_str(unified)
}

/// Wire response for a masking request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskResponse {
    pub masked_text: String,
    pub entities: Vec<EntityReport>,
    pub risk_score: f64,
    pub cached: bool,
}

impl From<MaskedResult> for MaskResponse {
    fn from(result: MaskedResult) -> Self {
        Self {
            masked_text: result.masked_text,
            entities: result.entities,
            risk_score: result.risk_score,
            cached: result.cached,
        }
    }
}

/// Error body for a failed request. Server-side failures get a generic
/// message that carries neither diagnostics nor input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub detail: String,
}

impl ErrorBody {
    pub fn for_error(error: &MaskError) -> Self {
        let status = error.status_code();
        let detail = match status {
            503 => "Service temporarily overloaded".to_string(),
            500..=599 => "Internal server error".to_string(),
            _ => error.to_string(),
        };
        Self { status, detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::InferenceError;

    fn limits() -> InputLimits {
        InputLimits::default()
    }

    #[test]
    fn test_parse_and_validate() {
        let request = MaskRequest::from_json(r#"{"text": "佐藤に資料投げました"}"#.as_bytes()).unwrap();
        assert_eq!(request.validate(&limits()).unwrap(), "佐藤に資料投げました");
    }

    #[test]
    fn test_missing_and_null_text_are_400() {
        for body in [r#"{}"#, r#"{"text": null}"#] {
            let request = MaskRequest::from_json(body.as_bytes()).unwrap();
            let err = request.validate(&limits()).unwrap_err();
            assert_eq!(err, ValidationError::MissingText);
            assert_eq!(err.status_code(), 400);
        }
    }

    #[test]
    fn test_malformed_bodies_are_422() {
        for body in [r#"{"text": "#, r#"{"text": 42}"#, r#"[1, 2]"#] {
            let err = MaskRequest::from_json(body.as_bytes()).unwrap_err();
            assert_eq!(err.status_code(), 422, "{}", body);
        }
    }

    #[test]
    fn test_byte_length_bounds() {
        assert_eq!(
            validate_text("", &limits()).unwrap_err(),
            ValidationError::TooShort { min: 1, actual: 0 }
        );
        // 342 three-byte chars is 1026 bytes, well under 1024 chars.
        let long = "あ".repeat(342);
        assert_eq!(
            validate_text(&long, &limits()).unwrap_err(),
            ValidationError::TooLong { max: 1024, actual: 1026 }
        );
        assert!(validate_text(&"あ".repeat(341), &limits()).is_ok());
    }

    #[test]
    fn test_blank_text_is_missing() {
        assert_eq!(validate_text("   \n", &limits()).unwrap_err(), ValidationError::MissingText);
    }

    #[test]
    fn test_normalization() {
        assert_eq!(normalize("\x1b[31m至急\x1b[0m\r\nです\r"), "至急\nです\n");
    }

    #[test]
    fn test_error_bodies_hide_internal_details() {
        let internal = ErrorBody::for_error(&MaskError::Internal("span bug at 3".into()));
        assert_eq!(internal.status, 500);
        assert_eq!(internal.detail, "Internal server error");

        let overloaded = ErrorBody::for_error(&MaskError::from(InferenceError::Overloaded(64)));
        assert_eq!(overloaded.status, 503);

        let invalid = ErrorBody::for_error(&MaskError::from(ValidationError::MissingText));
        assert_eq!(invalid.status, 400);
        assert_eq!(invalid.detail, "text is required");
    }
}
