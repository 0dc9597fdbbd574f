//! tagging.rs - Turns BIO-tagged tokens from the NER engine into entity spans.
//!
//! License: MIT OR APACHE 2.0

use log::warn;
use serde::{Deserialize, Serialize};

use crate::span::Span;

/// One token as reported by the NER engine, in char offsets of the text it
/// was run on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub start: usize,
    pub end: usize,
    pub tag: String,
}

impl TaggedToken {
    pub fn new(start: usize, end: usize, tag: impl Into<String>) -> Self {
        Self {
            start,
            end,
            tag: tag.into(),
        }
    }
}

/// A parsed tag. `S-` is read as `B-` and `E-` as `I-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag<'a> {
    Begin(&'a str),
    Inside(&'a str),
    Outside,
}

impl<'a> Tag<'a> {
    /// `None` for anything that is not `O` or a prefixed, non-empty label.
    pub fn parse(raw: &'a str) -> Option<Self> {
        if raw == "O" {
            return Some(Tag::Outside);
        }
        let (prefix, label) = raw.split_once('-')?;
        if label.is_empty() {
            return None;
        }
        match prefix {
            "B" | "S" => Some(Tag::Begin(label)),
            "I" | "E" => Some(Tag::Inside(label)),
            _ => None,
        }
    }
}

struct OpenSpan<'a> {
    start: usize,
    end: usize,
    label: &'a str,
}

/// Merges tagged tokens into entity spans.
///
/// A span starts at `B-L`, extends through directly adjacent `I-L` tokens and
/// ends at a gap, an `O`, or a different label. An `I-L` that does not
/// continue an open `L` span starts a new one. Zero-length, out-of-bounds and
/// out-of-order tokens are discarded.
pub fn entity_spans(tokens: &[TaggedToken], text_char_len: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut open: Option<OpenSpan<'_>> = None;
    let mut last_end = 0;

    for token in tokens {
        if token.start >= token.end {
            warn!("Discarding zero-length token [{}, {}).", token.start, token.end);
            continue;
        }
        if token.end > text_char_len {
            warn!(
                "Discarding token [{}, {}) beyond text length {}.",
                token.start, token.end, text_char_len
            );
            continue;
        }
        if token.start < last_end {
            warn!(
                "Discarding out-of-order token [{}, {}) (previous token ended at {}).",
                token.start, token.end, last_end
            );
            continue;
        }
        last_end = token.end;

        let tag = Tag::parse(&token.tag).unwrap_or_else(|| {
            warn!("Unknown tag '{}' treated as O.", token.tag);
            Tag::Outside
        });

        match tag {
            Tag::Outside => close(&mut open, &mut spans),
            Tag::Inside(label) => {
                let continues = open
                    .as_ref()
                    .is_some_and(|current| current.label == label && current.end == token.start);
                if continues {
                    if let Some(current) = open.as_mut() {
                        current.end = token.end;
                    }
                } else {
                    close(&mut open, &mut spans);
                    open = Some(OpenSpan { start: token.start, end: token.end, label });
                }
            }
            Tag::Begin(label) => {
                close(&mut open, &mut spans);
                open = Some(OpenSpan { start: token.start, end: token.end, label });
            }
        }
    }
    close(&mut open, &mut spans);
    spans
}

fn close(open: &mut Option<OpenSpan<'_>>, spans: &mut Vec<Span>) {
    if let Some(current) = open.take() {
        if let Ok(span) = Span::entity(current.start, current.end, current.label) {
            spans.push(span);
        }
    }
}
