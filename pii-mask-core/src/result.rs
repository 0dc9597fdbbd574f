//! result.rs - The value produced for one masking request.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};

use crate::consolidate::EntityReport;

/// Masked text, reported entities and risk score for one normalized input.
///
/// Cached values are stored with `cached = false`; readers receive a copy
/// with the flag set for their own response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskedResult {
    pub masked_text: String,
    pub entities: Vec<EntityReport>,
    pub risk_score: f64,
    pub cached: bool,
}

impl MaskedResult {
    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }
}
