// pii-mask-core/src/lib.rs
//! # pii-mask Core Library
//!
//! `pii-mask-core` detects personally identifiable information in short
//! Japanese text, masks it with a fixed token and scores the residual risk.
//! Two detectors contribute spans: a compiled pattern registry running on the
//! original text, and an NER engine running on the text after pattern spans
//! were masked. Their spans are reconciled through an explicit offset map and
//! the final mask is applied to the original text in one pass.
//!
//! ## Modules
//!
//! * `config`: `MaskingConfig`, pattern descriptors and per-component settings.
//! * `patterns`: the validated, immutable `PatternRegistry`.
//! * `engines`: the pattern detector and the built-in gazetteer NER engine.
//! * `engine`: the `NerEngine` contract for external tokenizer+NER engines.
//! * `span`, `offset_map`: span types and coordinate translation.
//! * `tagging`: BIO token merging into entity spans.
//! * `consolidate`, `mask`, `risk`: the per-request stages.
//! * `pipeline`: the stages in order.
//! * `inference`: the bounded session pool in front of the NER engine.
//! * `cache`: the content-addressed, single-flight response cache.
//! * `stats`: fire-and-forget statistics events.
//! * `request`: validation, normalization and wire types.
//! * `service`: the async `MaskingService` tying everything together.
//!
//! ## Usage Example
//!
//! ```no_run
//! use pii_mask_core::{MaskingConfig, MaskingService};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = MaskingConfig::load_default()?;
//! let service = MaskingService::new(config)?;
//!
//! let result = service.mask("至急 03-1234-5678 まで！").await?;
//! assert_eq!(result.masked_text, "至急 <MASK> まで！");
//! assert_eq!(result.risk_score, 0.3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Request-path failures are [`MaskError`] values that map onto transport
//! status codes with [`MaskError::status_code`]. Configuration loading
//! returns `anyhow::Result` with context.
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod cache;
pub mod config;
pub mod consolidate;
pub mod engine;
pub mod engines;
pub mod errors;
pub mod inference;
pub mod logging;
pub mod mask;
pub mod offset_map;
pub mod patterns;
pub mod pipeline;
pub mod request;
pub mod result;
pub mod risk;
pub mod service;
pub mod span;
pub mod stats;
pub mod tagging;

/// Configuration types and loaders.
pub use config::{
    merge_config,
    merge_patterns,
    CacheConfig,
    GazetteerConfig,
    InferenceConfig,
    InputLimits,
    MaskingConfig,
    PatternDescriptor,
    PatternKind,
    RiskWeights,
    DEFAULT_MASK_TOKEN,
    MAX_PATTERN_LENGTH,
};

pub use errors::{CacheUnavailableError, InferenceError, MaskError, PatternCompileError, ValidationError};

pub use span::{ConsolidatedSpan, Span, SpanSource};
pub use offset_map::{OffsetMap, RewriteRegion};
pub use tagging::{entity_spans, TaggedToken};
pub use consolidate::{Consolidation, EntityReport, SpanConsolidator};
pub use mask::MaskApplier;
pub use risk::{RiskMetrics, RiskScorer};
pub use result::MaskedResult;

pub use patterns::{CompiledPattern, PatternRegistry};
pub use engines::pattern_detector::PatternDetector;
pub use engines::gazetteer_tagger::GazetteerEngine;
pub use engine::{NerEngine, NerEngineFactory, SharedEngineFactory};
pub use inference::InferencePool;

pub use cache::{CacheBackend, CacheKey, CacheStats, InMemoryBackend, ResponseCache};
pub use stats::{StatsEvent, StatsPublisher};
pub use request::{ErrorBody, MaskRequest, MaskResponse};
pub use pipeline::MaskingPipeline;
pub use service::{MaskingService, MaskingServiceBuilder};

pub use logging::redact_sensitive;
