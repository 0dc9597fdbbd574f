// pii-mask-gazetteer/src/dictionary/mod.rs
use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use daachorse::{DoubleArrayAhoCorasick, DoubleArrayAhoCorasickBuilder, MatchKind};

/// Errors raised while building a [`Gazetteer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GazetteerError {
    /// An entry had an empty word or label.
    EmptyEntry,
    /// The automaton could not be built.
    Build(String),
}

impl fmt::Display for GazetteerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GazetteerError::EmptyEntry => write!(f, "gazetteer entries must have a non-empty word and label"),
            GazetteerError::Build(msg) => write!(f, "failed to build gazetteer automaton: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for GazetteerError {}

/// A dictionary hit, in byte offsets of the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GazetteerHit<'g> {
    pub start: usize,
    pub end: usize,
    pub label: &'g str,
}

/// Leftmost-longest dictionary matcher over `(word, label)` entries.
///
/// Entries whose edges are ASCII alphanumeric only match on ASCII word
/// boundaries, so `NHK` does not fire inside `NHKK`.
pub struct Gazetteer {
    automaton: Option<DoubleArrayAhoCorasick<u32>>,
    labels: Vec<String>,
}

impl fmt::Debug for Gazetteer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gazetteer")
         .field("automaton", &"<DoubleArrayAhoCorasick>")
         .field("entries", &self.labels.len())
         .finish()
    }
}

impl Gazetteer {
    /// Builds a gazetteer. Duplicate words keep their first label.
    pub fn new<'a, I>(entries: I) -> Result<Self, GazetteerError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut seen = BTreeSet::new();
        let mut words: Vec<(&'a str, u32)> = Vec::new();
        let mut labels = Vec::new();

        for (word, label) in entries {
            if word.is_empty() || label.is_empty() {
                return Err(GazetteerError::EmptyEntry);
            }
            if !seen.insert(word) {
                continue;
            }
            words.push((word, labels.len() as u32));
            labels.push(label.to_string());
        }

        if words.is_empty() {
            return Ok(Self { automaton: None, labels });
        }

        let automaton = DoubleArrayAhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostLongest)
            .build_with_values(words)
            .map_err(|e| GazetteerError::Build(e.to_string()))?;

        Ok(Self { automaton: Some(automaton), labels })
    }

    /// Builds the gazetteer from the embedded default word lists.
    pub fn with_defaults() -> Result<Self, GazetteerError> {
        Self::new(crate::defaults::default_entries())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns non-overlapping hits sorted by start offset.
    pub fn find<'g>(&'g self, text: &str) -> Vec<GazetteerHit<'g>> {
        let Some(automaton) = self.automaton.as_ref() else {
            return Vec::new();
        };
        let bytes = text.as_bytes();

        automaton
            .leftmost_find_iter(text)
            .filter(|m| on_ascii_boundary(bytes, m.start(), m.end()))
            .map(|m| GazetteerHit {
                start: m.start(),
                end: m.end(),
                label: self.labels[m.value() as usize].as_str(),
            })
            .collect()
    }
}

fn on_ascii_boundary(bytes: &[u8], start: usize, end: usize) -> bool {
    let prefix_ok = start == 0
        || !bytes[start].is_ascii_alphanumeric()
        || !bytes[start - 1].is_ascii_alphanumeric();
    let suffix_ok = end == bytes.len()
        || !bytes[end - 1].is_ascii_alphanumeric()
        || !bytes[end].is_ascii_alphanumeric();
    prefix_ok && suffix_ok
}
