//! mask.rs - Substitutes the mask token for every span in a single pass.
//!
//! License: MIT OR APACHE 2.0

use log::debug;

use crate::config::DEFAULT_MASK_TOKEN;
use crate::errors::MaskError;
use crate::offset_map::{OffsetMap, RewriteRegion};
use crate::span::{CharIndex, Span};

/// Replaces spans with a fixed token and records where the text moved.
#[derive(Debug, Clone)]
pub struct MaskApplier {
    mask_token: String,
    token_chars: usize,
}

impl Default for MaskApplier {
    fn default() -> Self {
        Self {
            mask_token: DEFAULT_MASK_TOKEN.to_string(),
            token_chars: DEFAULT_MASK_TOKEN.chars().count(),
        }
    }
}

impl MaskApplier {
    pub fn new(mask_token: impl Into<String>) -> Result<Self, MaskError> {
        let mask_token = mask_token.into();
        if mask_token.is_empty() {
            return Err(MaskError::Config("mask token must not be empty".to_string()));
        }
        let token_chars = mask_token.chars().count();
        Ok(Self {
            mask_token,
            token_chars,
        })
    }

    pub fn mask_token(&self) -> &str {
        &self.mask_token
    }

    /// Masks `spans` in `text` with one left-to-right cursor scan.
    ///
    /// Spans must be sorted by `start`, non-overlapping and within the text;
    /// anything else is an internal error, since both callers construct their
    /// span lists to satisfy this.
    pub fn apply<S: AsRef<Span>>(
        &self,
        text: &str,
        spans: &[S],
    ) -> Result<(String, OffsetMap), MaskError> {
        let index = CharIndex::new(text);
        let mut masked = String::with_capacity(text.len());
        let mut map = OffsetMap::identity();
        let mut cursor = 0;
        let mut written = 0;

        for span in spans.iter().map(AsRef::as_ref) {
            if span.start() < cursor {
                return Err(MaskError::InvalidSpans(format!(
                    "span [{}, {}) is unsorted or overlaps the previous span ending at {}",
                    span.start(),
                    span.end(),
                    cursor
                )));
            }
            let kept = index.slice(cursor, span.start());
            let (Some(kept), true) = (kept, span.end() <= index.char_len()) else {
                return Err(MaskError::InvalidSpans(format!(
                    "span [{}, {}) is outside a text of {} chars",
                    span.start(),
                    span.end(),
                    index.char_len()
                )));
            };

            masked.push_str(kept);
            written += span.start() - cursor;
            masked.push_str(&self.mask_token);
            map.push(RewriteRegion {
                original_start: span.start(),
                original_end: span.end(),
                new_start: written,
                new_end: written + self.token_chars,
            })?;
            written += self.token_chars;
            cursor = span.end();
        }

        if let Some(rest) = index.slice(cursor, index.char_len()) {
            masked.push_str(rest);
        }
        debug!("Masked {} span(s).", map.regions().len());
        Ok((masked, map))
    }
}
