//! risk.rs - Deterministic, heuristic risk score for a masking result.
//!
//! License: MIT OR APACHE 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::RiskWeights;
use crate::consolidate::EntityReport;

/// Entity label counted by the person weights.
pub const PERSON_LABEL: &str = "PERSON";

pub const MIN_RISK_SCORE: f64 = 0.2;
pub const MAX_RISK_SCORE: f64 = 1.0;

/// Supplementary figures published with each stats event. They do not
/// influence the score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Pattern spans plus reported entities.
    pub entity_count: usize,
    pub person_count: usize,
    pub pattern_label_count: usize,
    /// 0.2 per distinct label across both detectors, capped at 1.0.
    pub diversity_score: f64,
    /// Findings per 100 chars scaled by 0.2, capped at 1.0.
    pub density_score: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer {
    weights: RiskWeights,
}

impl RiskScorer {
    pub fn new(weights: RiskWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Base weight, plus the single- or multiple-person weight, plus one
    /// increment per distinct pattern label. Clamped to `[0.2, 1.0]` and
    /// rounded to two decimals.
    pub fn score<'a, I>(&self, entities: &[EntityReport], pattern_labels: I) -> f64
    where
        I: IntoIterator<Item = &'a str>,
    {
        let persons = person_count(entities);
        let distinct_patterns: BTreeSet<&str> = pattern_labels.into_iter().collect();

        let mut score = self.weights.base;
        score += match persons {
            0 => 0.0,
            1 => self.weights.person_single,
            _ => self.weights.person_multiple,
        };
        score += distinct_patterns.len() as f64 * self.weights.pattern_increment;

        round2(score.clamp(MIN_RISK_SCORE, MAX_RISK_SCORE))
    }

    pub fn metrics<'a, I>(&self, entities: &[EntityReport], pattern_labels: I, text: &str) -> RiskMetrics
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pattern_labels: Vec<&str> = pattern_labels.into_iter().collect();
        let distinct_patterns: BTreeSet<&str> = pattern_labels.iter().copied().collect();
        let mut all_labels = distinct_patterns.clone();
        all_labels.extend(entities.iter().map(|e| e.label.as_str()));

        let entity_count = pattern_labels.len() + entities.len();
        let text_len = text.chars().count();
        let density_score = if text_len == 0 {
            0.0
        } else {
            (entity_count as f64 / text_len as f64 * 100.0 * 0.2).min(1.0)
        };

        RiskMetrics {
            entity_count,
            person_count: person_count(entities),
            pattern_label_count: distinct_patterns.len(),
            diversity_score: round2((all_labels.len() as f64 * 0.2).min(1.0)),
            density_score: round2(density_score),
        }
    }
}

fn person_count(entities: &[EntityReport]) -> usize {
    entities.iter().filter(|e| e.label == PERSON_LABEL).count()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
