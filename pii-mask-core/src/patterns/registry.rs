//! registry.rs - Compiles pattern descriptors into an immutable registry.
//!
//! The registry is built once at startup. Every descriptor is checked before
//! anything is returned: expressions must fit the linear-time `regex` engine,
//! stay under the length and automaton size limits, and must not match the
//! empty string. All problems are collected into one error so an operator can
//! fix a configuration in a single pass.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use crate::config::{PatternDescriptor, PatternKind, MAX_PATTERN_LENGTH};
use crate::errors::PatternCompileError;

/// Upper bound on the compiled automaton of a single pattern.
const REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// A single compiled pattern, ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// The unique name of the pattern.
    pub name: String,
    /// Label attached to every span this pattern produces.
    pub label: String,
    pub regex: Regex,
    /// Matches touching an ASCII digit on either side are rejected.
    pub digit_boundary: bool,
}

/// The compiled patterns in registration order. Earlier patterns take
/// priority when matches overlap.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    patterns: Vec<CompiledPattern>,
}

impl PatternRegistry {
    /// Compiles every enabled descriptor.
    pub fn compile<I>(descriptors: I) -> Result<Self, PatternCompileError>
    where
        I: IntoIterator<Item = PatternDescriptor>,
    {
        let descriptors: Vec<PatternDescriptor> = descriptors.into_iter().collect();
        debug!("Starting compilation of {} patterns.", descriptors.len());

        let mut patterns = Vec::with_capacity(descriptors.len());
        let mut errors = Vec::new();
        let mut seen_names = HashSet::new();

        for descriptor in descriptors {
            if !seen_names.insert(descriptor.name.clone()) {
                errors.push(PatternCompileError::rejected(
                    &descriptor.name,
                    "duplicate pattern name",
                ));
                continue;
            }
            if !descriptor.enabled {
                warn!("Skipping pattern '{}' because it is disabled.", descriptor.name);
                continue;
            }
            match compile_descriptor(&descriptor) {
                Ok(regex) => {
                    debug!("Pattern '{}' compiled successfully.", descriptor.name);
                    patterns.push(CompiledPattern {
                        name: descriptor.name,
                        label: descriptor.label,
                        regex,
                        digit_boundary: descriptor.digit_boundary,
                    });
                }
                Err(reason) => {
                    errors.push(PatternCompileError::rejected(descriptor.name, reason));
                }
            }
        }

        into_result(errors)?;
        debug!("Finished compiling patterns. Total compiled: {}.", patterns.len());
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CompiledPattern> {
        self.patterns.iter().find(|p| p.name == name)
    }

    /// Fails if any pattern would match the mask token itself, which would
    /// make a second masking pass rewrite its own output.
    pub fn ensure_mask_token_inert(&self, mask_token: &str) -> Result<(), PatternCompileError> {
        let offenders: Vec<PatternCompileError> = self
            .patterns
            .iter()
            .filter(|p| p.regex.is_match(mask_token))
            .map(|p| {
                PatternCompileError::rejected(
                    &p.name,
                    format!("matches the mask token '{}'", mask_token),
                )
            })
            .collect();
        into_result(offenders)
    }
}

/// A lone error is returned as-is; several are wrapped together.
fn into_result(mut errors: Vec<PatternCompileError>) -> Result<(), PatternCompileError> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(PatternCompileError::Multiple(errors)),
    }
}

fn compile_descriptor(descriptor: &PatternDescriptor) -> Result<Regex, String> {
    if descriptor.label.trim().is_empty() {
        return Err("label must not be empty".to_string());
    }

    let expression = match &descriptor.kind {
        PatternKind::Regex { expression } => {
            if expression.is_empty() {
                return Err("expression must not be empty".to_string());
            }
            expression.clone()
        }
        PatternKind::DigitRun { min_len, max_len } => {
            if *min_len == 0 || min_len > max_len {
                return Err(format!(
                    "invalid digit run length range {}..={}",
                    min_len, max_len
                ));
            }
            format!("[0-9]{{{},{}}}", min_len, max_len)
        }
    };

    if expression.len() > MAX_PATTERN_LENGTH {
        return Err(format!(
            "expression length {} exceeds the maximum of {}",
            expression.len(),
            MAX_PATTERN_LENGTH
        ));
    }

    let regex = RegexBuilder::new(&expression)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|e| e.to_string())?;

    if regex.is_match("") {
        return Err("expression matches the empty string".to_string());
    }
    Ok(regex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaskingConfig;

    #[test]
    fn test_default_patterns_compile() {
        let config = MaskingConfig::load_default().unwrap();
        let registry = PatternRegistry::compile(config.patterns).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.patterns()[0].name, "email");
        assert!(registry.get("mynumber").unwrap().regex.is_match("123456789012"));
        registry.ensure_mask_token_inert("<MASK>").unwrap();
    }

    #[test]
    fn test_backreference_is_rejected_at_compile_time() {
        let err = PatternRegistry::compile(vec![PatternDescriptor::regex(
            "repeat",
            "REPEAT",
            r"(a)\1",
        )])
        .unwrap_err();
        assert_eq!(err.offending_patterns(), vec!["repeat"]);
    }

    #[test]
    fn test_lookaround_is_rejected_at_compile_time() {
        let err = PatternRegistry::compile(vec![PatternDescriptor::regex(
            "lookahead",
            "X",
            r"[0-9]+(?=円)",
        )])
        .unwrap_err();
        assert_eq!(err.offending_patterns(), vec!["lookahead"]);
    }

    #[test]
    fn test_every_bad_descriptor_is_reported() {
        let long = "a".repeat(MAX_PATTERN_LENGTH + 1);
        let err = PatternRegistry::compile(vec![
            PatternDescriptor::regex("ok", "OK", "[0-9]{3}"),
            PatternDescriptor::regex("too_long", "X", &long),
            PatternDescriptor::regex("empty_match", "X", "[0-9]*"),
            PatternDescriptor::regex("no_label", "", "x"),
            PatternDescriptor::digit_run("bad_run", "X", 5, 2),
            PatternDescriptor::regex("ok", "OK", "[0-9]{4}"),
        ])
        .unwrap_err();
        assert_eq!(
            err.offending_patterns(),
            vec!["too_long", "empty_match", "no_label", "bad_run", "ok"]
        );
    }

    #[test]
    fn test_disabled_patterns_are_skipped() {
        let mut disabled = PatternDescriptor::regex("off", "OFF", "x");
        disabled.enabled = false;
        let registry =
            PatternRegistry::compile(vec![disabled, PatternDescriptor::regex("on", "ON", "y")])
                .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("off").is_none());
    }

    #[test]
    fn test_pattern_matching_the_mask_token_is_flagged() {
        let registry =
            PatternRegistry::compile(vec![PatternDescriptor::regex("tag", "TAG", "<[A-Z]+>")])
                .unwrap();
        let err = registry.ensure_mask_token_inert("<MASK>").unwrap_err();
        assert_eq!(err.offending_patterns(), vec!["tag"]);
    }
}
