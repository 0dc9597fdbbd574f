//! pipeline.rs - The per-request stages between validation and caching.
//!
//! Stages run strictly in sequence:
//!
//! 1. pattern detection on the original text,
//! 2. a first masking pass over the pattern spans only, producing the
//!    intermediate text and its offset map,
//! 3. NER on the intermediate text,
//! 4. consolidation back into original coordinates,
//! 5. a final masking pass over the original text,
//! 6. risk scoring.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use std::sync::Arc;

use crate::config::RiskWeights;
use crate::consolidate::{Consolidation, SpanConsolidator};
use crate::engines::pattern_detector::PatternDetector;
use crate::errors::MaskError;
use crate::inference::InferencePool;
use crate::mask::MaskApplier;
use crate::offset_map::OffsetMap;
use crate::patterns::PatternRegistry;
use crate::result::MaskedResult;
use crate::risk::{RiskMetrics, RiskScorer};
use crate::span::Span;
use crate::tagging::{entity_spans, TaggedToken};

/// Output of the first masking pass.
#[derive(Debug, Clone)]
pub struct FirstPass {
    pub pattern_spans: Vec<Span>,
    pub intermediate_text: String,
    pub offsets: OffsetMap,
}

/// Everything produced for one text, before caching.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub result: MaskedResult,
    pub consolidation: Consolidation,
    pub metrics: RiskMetrics,
}

impl PipelineOutput {
    pub fn pattern_labels(&self) -> impl Iterator<Item = &str> {
        self.consolidation.pattern_spans().map(Span::label)
    }
}

#[derive(Debug, Clone)]
pub struct MaskingPipeline {
    detector: PatternDetector,
    applier: MaskApplier,
    consolidator: SpanConsolidator,
    scorer: RiskScorer,
}

impl MaskingPipeline {
    pub fn new(registry: Arc<PatternRegistry>, mask_token: &str, weights: RiskWeights) -> Result<Self, MaskError> {
        Ok(Self {
            detector: PatternDetector::new(registry),
            applier: MaskApplier::new(mask_token)?,
            consolidator: SpanConsolidator::new(),
            scorer: RiskScorer::new(weights),
        })
    }

    pub fn registry(&self) -> &PatternRegistry {
        self.detector.registry()
    }

    pub fn first_pass(&self, text: &str) -> Result<FirstPass, MaskError> {
        let pattern_spans = self.detector.detect(text);
        let (intermediate_text, offsets) = self.applier.apply(text, &pattern_spans)?;
        Ok(FirstPass {
            pattern_spans,
            intermediate_text,
            offsets,
        })
    }

    /// Consolidates the NER tokens of the intermediate text, masks the
    /// original text from scratch and scores the result.
    pub fn finish(&self, text: &str, first: &FirstPass, tokens: &[TaggedToken]) -> Result<PipelineOutput, MaskError> {
        let entities = entity_spans(tokens, first.intermediate_text.chars().count());
        let consolidation =
            self.consolidator
                .consolidate(text, &first.pattern_spans, &entities, &first.offsets);
        let (masked_text, _) = self.applier.apply(text, &consolidation.spans)?;

        let labels: Vec<&str> = consolidation.pattern_spans().map(Span::label).collect();
        let risk_score = self.scorer.score(&consolidation.entities, labels.iter().copied());
        let metrics = self.scorer.metrics(&consolidation.entities, labels.iter().copied(), text);
        debug!(
            "Pipeline finished: {} span(s), {} entity report(s), risk {}.",
            consolidation.spans.len(),
            consolidation.entities.len(),
            risk_score
        );

        Ok(PipelineOutput {
            result: MaskedResult {
                masked_text,
                entities: consolidation.entities.clone(),
                risk_score,
                cached: false,
            },
            consolidation,
            metrics,
        })
    }

    /// Runs every stage on already validated, normalized text.
    pub async fn run(&self, text: &str, inference: &InferencePool) -> Result<PipelineOutput, MaskError> {
        let first = self.first_pass(text)?;
        let tokens = inference.infer(&first.intermediate_text).await?;
        self.finish(text, &first, &tokens)
    }
}
