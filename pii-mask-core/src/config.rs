//! Configuration management for `pii-mask-core`.
//!
//! This module defines the typed pattern descriptors and the per-component
//! settings (limits, cache, inference, risk weights, gazetteer). It handles
//! YAML deserialization, merging user files over the built-in defaults,
//! environment overrides and validation. Validation failures abort startup.
//!
//! License: MIT OR Apache-2.0

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum allowed length for a pattern expression.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// Sentinel substituted for every masked span.
pub const DEFAULT_MASK_TOKEN: &str = "<MASK>";

/// How a pattern matches text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternKind {
    /// A regular expression for the linear-time `regex` engine.
    Regex { expression: String },
    /// A run of ASCII digits, e.g. national ID numbers.
    DigitRun { min_len: usize, max_len: usize },
}

/// A single detection pattern as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct PatternDescriptor {
    /// Unique identifier (e.g. "phone_number").
    pub name: String,
    /// Label reported for matches (e.g. "PHONE_NUMBER").
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: PatternKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Reject matches directly preceded or followed by an ASCII digit.
    #[serde(default)]
    pub digit_boundary: bool,
}

impl PatternDescriptor {
    pub fn regex(name: &str, label: &str, expression: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            description: None,
            kind: PatternKind::Regex {
                expression: expression.to_string(),
            },
            enabled: true,
            digit_boundary: false,
        }
    }

    pub fn digit_run(name: &str, label: &str, min_len: usize, max_len: usize) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            description: None,
            kind: PatternKind::DigitRun { min_len, max_len },
            enabled: true,
            digit_boundary: true,
        }
    }

    pub fn with_digit_boundary(mut self, digit_boundary: bool) -> Self {
        self.digit_boundary = digit_boundary;
        self
    }
}

fn default_true() -> bool {
    true
}

/// Byte-length bounds on request text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputLimits {
    pub min_bytes: usize,
    pub max_bytes: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            min_bytes: 1,
            max_bytes: 1024,
        }
    }
}

/// Settings for the in-process response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Absolute lifetime of an entry, counted from insertion.
    pub ttl_secs: u64,
    /// Maximum number of entries before least-recently-used eviction.
    pub capacity: usize,
    /// Period of the background sweep of expired entries; 0 disables it.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 86_400,
            capacity: 10_000,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Settings for the session pool in front of the NER engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Number of concurrent engine sessions.
    pub sessions: usize,
    /// Requests allowed to wait for a session before new ones are rejected.
    pub max_queue_depth: usize,
    pub timeout_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            sessions: 4,
            max_queue_depth: 64,
            timeout_ms: 2_000,
        }
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Risk score weights.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskWeights {
    pub base: f64,
    pub person_single: f64,
    pub person_multiple: f64,
    /// Added once per distinct pattern label that matched.
    pub pattern_increment: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            base: 0.2,
            person_single: 0.4,
            person_multiple: 0.7,
            pattern_increment: 0.1,
        }
    }
}

/// Dictionary used by the built-in gazetteer tagger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GazetteerConfig {
    pub include_defaults: bool,
    /// Optional YAML file mapping labels to word lists.
    pub path: Option<PathBuf>,
    /// Extra words keyed by label.
    pub entries: BTreeMap<String, Vec<String>>,
}

impl Default for GazetteerConfig {
    fn default() -> Self {
        Self {
            include_defaults: true,
            path: None,
            entries: BTreeMap::new(),
        }
    }
}

impl GazetteerConfig {
    /// Collects `(word, label)` pairs from `entries` and the optional file.
    pub fn load_entries(&self) -> Result<Vec<(String, String)>> {
        let mut by_label = self.entries.clone();
        if let Some(path) = &self.path {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read gazetteer file {}", path.display()))?;
            let from_file: BTreeMap<String, Vec<String>> = serde_yml::from_str(&text)
                .with_context(|| format!("Failed to parse gazetteer file {}", path.display()))?;
            for (label, words) in from_file {
                by_label.entry(label).or_default().extend(words);
            }
        }
        Ok(by_label
            .into_iter()
            .flat_map(|(label, words)| words.into_iter().map(move |w| (w, label.clone())))
            .collect())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MaskingConfig {
    pub mask_token: String,
    pub limits: InputLimits,
    /// Detection patterns in registration (priority) order.
    pub patterns: Vec<PatternDescriptor>,
    pub cache: CacheConfig,
    pub inference: InferenceConfig,
    pub risk: RiskWeights,
    pub gazetteer: GazetteerConfig,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            mask_token: DEFAULT_MASK_TOKEN.to_string(),
            limits: InputLimits::default(),
            patterns: Vec::new(),
            cache: CacheConfig::default(),
            inference: InferenceConfig::default(),
            risk: RiskWeights::default(),
            gazetteer: GazetteerConfig::default(),
        }
    }
}

impl MaskingConfig {
    /// Loads a configuration from a YAML file and validates it.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: MaskingConfig = serde_yml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        info!("Loaded {} patterns from file {}.", config.patterns.len(), path.display());
        Ok(config)
    }

    /// Loads the embedded built-in configuration.
    pub fn load_default() -> Result<Self> {
        debug!("Loading default configuration from embedded string...");
        let default_yaml = include_str!("../config/default_config.yaml");
        let config: MaskingConfig = serde_yml::from_str(default_yaml)
            .context("Failed to parse default configuration")?;

        debug!("Loaded {} default patterns.", config.patterns.len());
        Ok(config)
    }

    /// Applies `PII_MASK_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_value::<bool>("PII_MASK_CACHE_ENABLED") {
            self.cache.enabled = v;
        }
        if let Some(v) = env_value::<u64>("PII_MASK_CACHE_TTL_SECS") {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = env_value::<usize>("PII_MASK_CACHE_CAPACITY") {
            self.cache.capacity = v;
        }
        if let Some(v) = env_value::<u64>("PII_MASK_INFERENCE_TIMEOUT_MS") {
            self.inference.timeout_ms = v;
        }
        if let Some(v) = env_value::<usize>("PII_MASK_INFERENCE_SESSIONS") {
            self.inference.sessions = v;
        }
        if let Some(v) = env_value::<usize>("PII_MASK_MAX_BYTES") {
            self.limits.max_bytes = v;
        }
    }

    /// Checks every section; all problems are reported together.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.mask_token.is_empty() {
            errors.push("`mask_token` must not be empty.".to_string());
        }
        if self.limits.min_bytes == 0 {
            errors.push("`limits.min_bytes` must be at least 1.".to_string());
        }
        if self.limits.max_bytes < self.limits.min_bytes {
            errors.push("`limits.max_bytes` must not be smaller than `limits.min_bytes`.".to_string());
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            errors.push("`cache.capacity` must be greater than 0 when the cache is enabled.".to_string());
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            errors.push("`cache.ttl_secs` must be greater than 0 when the cache is enabled.".to_string());
        }
        if self.inference.sessions == 0 {
            errors.push("`inference.sessions` must be greater than 0.".to_string());
        }
        if self.inference.timeout_ms == 0 {
            errors.push("`inference.timeout_ms` must be greater than 0.".to_string());
        }

        let weights = [
            ("base", self.risk.base),
            ("person_single", self.risk.person_single),
            ("person_multiple", self.risk.person_multiple),
            ("pattern_increment", self.risk.pattern_increment),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("`risk.{}` must be a finite, non-negative number.", name));
            }
        }

        let mut names = HashSet::new();
        for pattern in &self.patterns {
            if pattern.name.is_empty() {
                errors.push("A pattern has an empty `name` field.".to_string());
            } else if !names.insert(pattern.name.as_str()) {
                errors.push(format!("Duplicate pattern name found: '{}'.", pattern.name));
            }
            if pattern.label.is_empty() {
                errors.push(format!("Pattern '{}' has an empty `label` field.", pattern.name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Configuration validation failed:\n{}", errors.join("\n")))
        }
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => {
            debug!("Overriding configuration from {}.", key);
            Some(value)
        }
        Err(_) => {
            warn!("Ignoring {}: could not parse '{}'.", key, raw);
            None
        }
    }
}

/// Merges a user configuration over the defaults.
///
/// User patterns replace default patterns with the same name in place and new
/// ones are appended, so registration order stays stable. Every other section
/// is taken from the user file.
pub fn merge_config(default_config: MaskingConfig, user_config: Option<MaskingConfig>) -> MaskingConfig {
    let Some(user) = user_config else {
        return default_config;
    };
    debug!(
        "Merging {} user patterns over {} defaults.",
        user.patterns.len(),
        default_config.patterns.len()
    );

    let patterns = merge_patterns(default_config.patterns, user.patterns);
    MaskingConfig { patterns, ..user }
}

/// Order-preserving merge of two pattern lists keyed by name.
pub fn merge_patterns(
    defaults: Vec<PatternDescriptor>,
    overrides: Vec<PatternDescriptor>,
) -> Vec<PatternDescriptor> {
    let mut merged = defaults;
    for pattern in overrides {
        match merged.iter_mut().find(|p| p.name == pattern.name) {
            Some(existing) => {
                debug!("Pattern '{}' overridden by user configuration.", pattern.name);
                *existing = pattern;
            }
            None => merged.push(pattern),
        }
    }
    merged
}
