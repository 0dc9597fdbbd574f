//! consolidate.rs - Merges pattern and entity spans into one masking plan.
//!
//! Pattern spans are found on the original text, entity spans on the
//! intermediate text produced by the first masking pass. Entity spans are
//! translated back through the first-pass [`OffsetMap`] before the two lists
//! are merged. When spans conflict, pattern spans win and the earlier entity
//! span wins over a later one.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::logging::log_entity_debug;
use crate::offset_map::OffsetMap;
use crate::span::{CharIndex, ConsolidatedSpan, Span};

/// An entity as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReport {
    pub text: String,
    pub label: String,
}

/// Output of consolidation, in original-text coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Consolidation {
    /// Every span to mask, sorted by `start` and non-overlapping.
    pub spans: Vec<ConsolidatedSpan>,
    /// The reportable entity spans with their original text, in text order.
    pub entities: Vec<EntityReport>,
}

impl Consolidation {
    pub fn pattern_spans(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(|s| !s.is_reportable()).map(ConsolidatedSpan::span)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpanConsolidator;

impl SpanConsolidator {
    pub fn new() -> Self {
        Self
    }

    /// `pattern_spans` must be sorted and disjoint, as produced by the
    /// pattern detector. `entity_spans` are in intermediate-text coordinates.
    pub fn consolidate(
        &self,
        original_text: &str,
        pattern_spans: &[Span],
        entity_spans: &[Span],
        first_pass: &OffsetMap,
    ) -> Consolidation {
        let index = CharIndex::new(original_text);

        let mut translated: Vec<Span> = entity_spans
            .iter()
            .filter_map(|span| match first_pass.to_original(span) {
                Ok(original) => Some(original),
                Err(e) => {
                    warn!("Dropping {} entity span: {}", span.label(), e);
                    None
                }
            })
            .filter(|span| {
                let conflict = pattern_spans.iter().find(|p| p.overlaps(span));
                if let Some(pattern) = conflict {
                    debug!(
                        "Dropping {} entity span [{}, {}): overlaps {} pattern span.",
                        span.label(),
                        span.start(),
                        span.end(),
                        pattern.label()
                    );
                }
                conflict.is_none()
            })
            .collect();
        translated.sort_by_key(Span::start);

        let mut entities: Vec<(Span, String)> = Vec::with_capacity(translated.len());
        for span in translated {
            if let Some((previous, _)) = entities.last() {
                if previous.overlaps(&span) {
                    debug!(
                        "Dropping {} entity span [{}, {}): overlaps an earlier entity.",
                        span.label(),
                        span.start(),
                        span.end()
                    );
                    continue;
                }
            }
            let Some(text) = index.slice(span.start(), span.end()) else {
                warn!(
                    "Dropping {} entity span [{}, {}): outside the original text.",
                    span.label(),
                    span.start(),
                    span.end()
                );
                continue;
            };
            log_entity_debug(module_path!(), span.label(), text, span.start(), span.end());
            entities.push((span, text.to_string()));
        }

        let reports = entities
            .iter()
            .map(|(span, text)| EntityReport {
                text: text.clone(),
                label: span.label().to_string(),
            })
            .collect();

        let mut spans: Vec<ConsolidatedSpan> = pattern_spans
            .iter()
            .cloned()
            .chain(entities.into_iter().map(|(span, _)| span))
            .map(ConsolidatedSpan::new)
            .collect();
        spans.sort_by_key(|s| s.span().start());

        Consolidation {
            spans,
            entities: reports,
        }
    }
}
