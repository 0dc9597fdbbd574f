// pii-mask-core/src/span.rs
//! Span types shared by every detection stage.
//!
//! All offsets are half-open and counted in Unicode scalar values (chars),
//! never bytes. [`CharIndex`] converts between the two when text has to be
//! sliced.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::MaskError;

/// Which detector produced a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanSource {
    Pattern,
    Entity,
}

impl fmt::Display for SpanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanSource::Pattern => write!(f, "pattern"),
            SpanSource::Entity => write!(f, "entity"),
        }
    }
}

/// A labelled `[start, end)` range. `start < end` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    start: usize,
    end: usize,
    label: String,
    source: SpanSource,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        label: impl Into<String>,
        source: SpanSource,
    ) -> Result<Self, MaskError> {
        if start >= end {
            return Err(MaskError::InvalidSpans(format!(
                "span [{}, {}) is empty or reversed",
                start, end
            )));
        }
        Ok(Self {
            start,
            end,
            label: label.into(),
            source,
        })
    }

    pub fn pattern(start: usize, end: usize, label: impl Into<String>) -> Result<Self, MaskError> {
        Self::new(start, end, label, SpanSource::Pattern)
    }

    pub fn entity(start: usize, end: usize, label: impl Into<String>) -> Result<Self, MaskError> {
        Self::new(start, end, label, SpanSource::Entity)
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> SpanSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// True if the two spans share at least one char.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.intersects(other.start, other.end)
    }

    pub fn intersects(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }

    /// Same label and source over a different range.
    pub fn with_range(&self, start: usize, end: usize) -> Result<Self, MaskError> {
        Self::new(start, end, self.label.clone(), self.source)
    }
}

impl AsRef<Span> for Span {
    fn as_ref(&self) -> &Span {
        self
    }
}

/// A span in original-text coordinates after consolidation.
///
/// Only entity spans are reportable; pattern spans are masked but never listed
/// back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsolidatedSpan {
    #[serde(flatten)]
    span: Span,
    reportable: bool,
}

impl ConsolidatedSpan {
    pub fn new(span: Span) -> Self {
        let reportable = span.source() == SpanSource::Entity;
        Self { span, reportable }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_reportable(&self) -> bool {
        self.reportable
    }
}

impl AsRef<Span> for ConsolidatedSpan {
    fn as_ref(&self) -> &Span {
        &self.span
    }
}

/// Char-position to byte-offset table for one string.
#[derive(Debug, Clone)]
pub struct CharIndex<'a> {
    text: &'a str,
    boundaries: Vec<usize>,
}

impl<'a> CharIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    /// Number of chars in the text.
    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn byte_offset(&self, char_pos: usize) -> Option<usize> {
        self.boundaries.get(char_pos).copied()
    }

    /// Char position of a byte offset that lies on a char boundary.
    pub fn char_offset(&self, byte: usize) -> Option<usize> {
        self.boundaries.binary_search(&byte).ok()
    }

    /// Slices `[start, end)` in char units.
    pub fn slice(&self, start: usize, end: usize) -> Option<&'a str> {
        if start > end {
            return None;
        }
        let from = self.byte_offset(start)?;
        let to = self.byte_offset(end)?;
        Some(&self.text[from..to])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_rejects_empty_range() {
        assert!(Span::pattern(3, 3, "PHONE_NUMBER").is_err());
        assert!(Span::entity(5, 2, "PERSON").is_err());
        assert_eq!(Span::entity(0, 2, "PERSON").unwrap().len(), 2);
    }

    #[test]
    fn test_span_overlap_is_half_open() {
        let a = Span::pattern(0, 4, "A").unwrap();
        let b = Span::pattern(4, 6, "B").unwrap();
        let c = Span::pattern(3, 5, "C").unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn test_only_entity_spans_are_reportable() {
        let entity = ConsolidatedSpan::new(Span::entity(0, 2, "PERSON").unwrap());
        let pattern = ConsolidatedSpan::new(Span::pattern(3, 8, "POSTAL_CODE").unwrap());
        assert!(entity.is_reportable());
        assert!(!pattern.is_reportable());
    }

    #[test]
    fn test_char_index_slices_multibyte_text() {
        let text = "佐藤に03-1234";
        let index = CharIndex::new(text);
        assert_eq!(index.char_len(), 10);
        assert_eq!(index.slice(0, 2), Some("佐藤"));
        assert_eq!(index.slice(3, 10), Some("03-1234"));
        assert_eq!(index.slice(3, 11), None);
        assert_eq!(index.char_offset("佐藤".len()), Some(2));
        assert_eq!(index.char_offset(1), None);
    }
}
