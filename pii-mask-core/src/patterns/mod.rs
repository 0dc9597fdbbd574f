//! Pattern layer: compiled, validated detection patterns.
//!
//! License: MIT OR APACHE 2.0

pub mod registry;

pub use registry::{CompiledPattern, PatternRegistry};
