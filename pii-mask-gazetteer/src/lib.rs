// pii-mask-gazetteer/src/lib.rs
//! Dictionary-driven entity tagger used as the default stand-in for a
//! tokenizer + NER model.
//!
//! The tagger segments text into tokens (dictionary hits plus script runs) and
//! tags them with a begin/inside/outside scheme. Offsets are reported in
//! Unicode scalar units, never bytes.
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod defaults;
pub mod dictionary;
pub mod script;
pub mod tagger;

pub use defaults::default_entries;
pub use dictionary::{Gazetteer, GazetteerError, GazetteerHit};
pub use tagger::{GazetteerTagger, RawToken};

/// Tag emitted for tokens that are not part of any entity.
pub const OUTSIDE_TAG: &str = "O";
