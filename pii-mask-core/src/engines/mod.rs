// pii-mask-core/src/engines/mod.rs
//! Concrete detectors used by the masking pipeline.
//!
//! * `pattern_detector` runs the compiled pattern registry over text.
//! * `gazetteer_tagger` is the dictionary-backed `NerEngine` used when no
//!   model is plugged in.
//!
//! # License
//! MIT OR APACHE 2.0

pub mod gazetteer_tagger;
pub mod pattern_detector;
