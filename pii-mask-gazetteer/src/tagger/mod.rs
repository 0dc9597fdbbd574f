// pii-mask-gazetteer/src/tagger/mod.rs
//! Turns dictionary hits into a BIO-tagged token stream.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::dictionary::{Gazetteer, GazetteerError};
use crate::script::{classify, Script};
use crate::OUTSIDE_TAG;

/// A tagged token. Offsets are half-open and counted in chars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub start: usize,
    pub end: usize,
    pub tag: String,
}

/// Tokenizes text into dictionary hits and script runs.
///
/// Each dictionary hit becomes a single `B-<label>` token. Everything else is
/// split into runs of the same script tagged `O`; whitespace is skipped, so it
/// shows up as a gap between tokens. Punctuation and symbols form one token
/// per character.
#[derive(Debug)]
pub struct GazetteerTagger {
    gazetteer: Gazetteer,
}

impl GazetteerTagger {
    pub fn new(gazetteer: Gazetteer) -> Self {
        Self { gazetteer }
    }

    pub fn with_defaults() -> Result<Self, GazetteerError> {
        Ok(Self::new(Gazetteer::with_defaults()?))
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    pub fn tag(&self, text: &str) -> Vec<RawToken> {
        let mut hits = self.gazetteer.find(text).into_iter().peekable();
        let mut tokens = Vec::new();
        let mut run: Option<(Script, usize)> = None;
        let mut skip_until = 0usize;

        for (pos, (byte, c)) in text.char_indices().enumerate() {
            if byte < skip_until {
                continue;
            }

            if let Some(hit) = hits.next_if(|h| h.start == byte) {
                flush_run(&mut run, pos, &mut tokens);
                let len = text[hit.start..hit.end].chars().count();
                tokens.push(RawToken {
                    start: pos,
                    end: pos + len,
                    tag: format!("B-{}", hit.label),
                });
                skip_until = hit.end;
                continue;
            }

            let script = classify(c);
            match (run, script) {
                (Some((current, _)), s) if current == s && s != Script::Other => {}
                (_, Script::Whitespace) => flush_run(&mut run, pos, &mut tokens),
                (_, Script::Other) => {
                    flush_run(&mut run, pos, &mut tokens);
                    tokens.push(RawToken {
                        start: pos,
                        end: pos + 1,
                        tag: OUTSIDE_TAG.to_string(),
                    });
                }
                (_, s) => {
                    flush_run(&mut run, pos, &mut tokens);
                    run = Some((s, pos));
                }
            }
        }

        flush_run(&mut run, text.chars().count(), &mut tokens);
        tokens
    }
}

fn flush_run(run: &mut Option<(Script, usize)>, end: usize, tokens: &mut Vec<RawToken>) {
    if let Some((_, start)) = run.take() {
        if start < end {
            tokens.push(RawToken {
                start,
                end,
                tag: OUTSIDE_TAG.to_string(),
            });
        }
    }
}
