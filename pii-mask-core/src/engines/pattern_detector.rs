// pii-mask-core/src/engines/pattern_detector.rs
//! Finds pattern spans in text using the compiled registry.
//!
//! Matching runs on bytes; every span leaving this module is converted to
//! char offsets. Patterns are applied in registration order and an earlier
//! pattern owns any region it matched: later matches are cut down to the parts
//! nobody owns yet, or dropped when fully covered.
//! License: MIT OR APACHE 2.0

use log::debug;
use std::sync::Arc;

use crate::logging::get_loggable_content;
use crate::patterns::{CompiledPattern, PatternRegistry};
use crate::span::{CharIndex, Span};

#[derive(Debug, Clone)]
pub struct PatternDetector {
    registry: Arc<PatternRegistry>,
}

impl PatternDetector {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Returns non-overlapping pattern spans sorted by `start`.
    pub fn detect(&self, text: &str) -> Vec<Span> {
        let index = CharIndex::new(text);
        let mut accepted: Vec<Span> = Vec::new();

        for pattern in self.registry.patterns() {
            for (start, end) in find_matches(pattern, text, &index) {
                for (piece_start, piece_end) in uncovered_pieces(start, end, &accepted) {
                    if (piece_start, piece_end) != (start, end) {
                        debug!(
                            "Pattern '{}' match [{}, {}) truncated to [{}, {}) by an earlier pattern.",
                            pattern.name, start, end, piece_start, piece_end
                        );
                    }
                    if let Ok(span) = Span::pattern(piece_start, piece_end, pattern.label.as_str()) {
                        accepted.push(span);
                    }
                }
            }
        }

        accepted.sort_by_key(Span::start);
        debug!("Pattern detection found {} span(s).", accepted.len());
        accepted
    }
}

/// All accepted matches of one pattern, as char ranges.
fn find_matches(pattern: &CompiledPattern, text: &str, index: &CharIndex<'_>) -> Vec<(usize, usize)> {
    let mut matches = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(m) = pattern.regex.find_at(text, pos) else {
            break;
        };
        if m.start() == m.end() {
            pos = next_char_boundary(text, m.end());
            continue;
        }
        if pattern.digit_boundary && touches_ascii_digit(text, m.start(), m.end()) {
            debug!(
                "Pattern '{}' candidate {} rejected: adjacent to a digit.",
                pattern.name,
                get_loggable_content(m.as_str())
            );
            // Retry one char later so a rejected candidate cannot hide a valid one.
            pos = next_char_boundary(text, m.start());
            continue;
        }
        if let (Some(start), Some(end)) = (index.char_offset(m.start()), index.char_offset(m.end())) {
            matches.push((start, end));
        }
        pos = m.end();
    }
    matches
}

fn next_char_boundary(text: &str, byte: usize) -> usize {
    byte + text[byte..].chars().next().map_or(1, char::len_utf8)
}

fn touches_ascii_digit(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_some_and(|c| c.is_ascii_digit()) || after.is_some_and(|c| c.is_ascii_digit())
}

/// Parts of `[start, end)` not covered by any accepted span.
fn uncovered_pieces(start: usize, end: usize, accepted: &[Span]) -> Vec<(usize, usize)> {
    let mut covering: Vec<(usize, usize)> = accepted
        .iter()
        .filter(|s| s.intersects(start, end))
        .map(|s| (s.start(), s.end()))
        .collect();
    covering.sort_unstable();

    let mut pieces = Vec::new();
    let mut cursor = start;
    for (cover_start, cover_end) in covering {
        if cover_start > cursor {
            pieces.push((cursor, cover_start));
        }
        cursor = cursor.max(cover_end);
    }
    if cursor < end {
        pieces.push((cursor, end));
    }
    pieces
}
