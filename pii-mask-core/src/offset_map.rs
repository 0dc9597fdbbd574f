// pii-mask-core/src/offset_map.rs
//! Coordinate translation between a text and a rewritten copy of it.
//!
//! Every rewrite records the regions it replaced. Positions outside those
//! regions shift by the cumulative length delta of the regions before them;
//! positions inside a rewritten region have no counterpart and are rejected.

use serde::Serialize;
use thiserror::Error;

use crate::errors::MaskError;
use crate::span::Span;

/// One replaced region: `[original_start, original_end)` in the source text
/// became `[new_start, new_end)` in the rewritten text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewriteRegion {
    pub original_start: usize,
    pub original_end: usize,
    pub new_start: usize,
    pub new_end: usize,
}

impl RewriteRegion {
    fn delta(&self) -> isize {
        (self.new_end - self.new_start) as isize - (self.original_end - self.original_start) as isize
    }
}

/// A span could not be translated because it touches a rewritten region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("span [{start}, {end}) overlaps rewritten region {region:?}")]
pub struct TranslationError {
    pub start: usize,
    pub end: usize,
    pub region: RewriteRegion,
}

/// Ordered, disjoint rewrite regions plus their running length deltas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMap {
    regions: Vec<RewriteRegion>,
    cumulative: Vec<isize>,
}

impl OffsetMap {
    /// The map of a text that was not rewritten.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Appends a region. Regions must arrive in order and agree with the
    /// running delta.
    pub fn push(&mut self, region: RewriteRegion) -> Result<(), MaskError> {
        if region.original_start > region.original_end || region.new_start > region.new_end {
            return Err(MaskError::InvalidSpans(format!("reversed rewrite region {:?}", region)));
        }
        if let Some(last) = self.regions.last() {
            if region.original_start < last.original_end {
                return Err(MaskError::InvalidSpans(format!(
                    "rewrite region {:?} starts before the end of {:?}",
                    region, last
                )));
            }
        }
        let expected_new_start = region.original_start as isize + self.total_delta();
        if region.new_start as isize != expected_new_start {
            return Err(MaskError::InvalidSpans(format!(
                "rewrite region {:?} should start at {} in the rewritten text",
                region, expected_new_start
            )));
        }

        let running = self.total_delta() + region.delta();
        self.regions.push(region);
        self.cumulative.push(running);
        Ok(())
    }

    pub fn regions(&self) -> &[RewriteRegion] {
        &self.regions
    }

    pub fn is_identity(&self) -> bool {
        self.regions.is_empty()
    }

    /// Length of the rewritten text minus length of the original.
    pub fn total_delta(&self) -> isize {
        self.cumulative.last().copied().unwrap_or(0)
    }

    /// Translates a span detected in the rewritten text back to the original.
    pub fn to_original(&self, span: &Span) -> Result<Span, TranslationError> {
        let idx = self.regions.partition_point(|r| r.new_end <= span.start());
        if let Some(region) = self.regions.get(idx) {
            if region.new_start < span.end() {
                return Err(self.reject(span, *region));
            }
        }
        let delta = self.delta_before(idx);
        Ok(shift(span, -delta))
    }

    /// Translates a span of the original text into the rewritten text.
    pub fn to_rewritten(&self, span: &Span) -> Result<Span, TranslationError> {
        let idx = self.regions.partition_point(|r| r.original_end <= span.start());
        if let Some(region) = self.regions.get(idx) {
            if region.original_start < span.end() {
                return Err(self.reject(span, *region));
            }
        }
        let delta = self.delta_before(idx);
        Ok(shift(span, delta))
    }

    fn delta_before(&self, idx: usize) -> isize {
        if idx == 0 {
            0
        } else {
            self.cumulative[idx - 1]
        }
    }

    fn reject(&self, span: &Span, region: RewriteRegion) -> TranslationError {
        TranslationError {
            start: span.start(),
            end: span.end(),
            region,
        }
    }
}

fn shift(span: &Span, delta: isize) -> Span {
    let start = (span.start() as isize + delta) as usize;
    let end = (span.end() as isize + delta) as usize;
    // A shift keeps the length, so the range stays non-empty.
    match span.with_range(start, end) {
        Ok(shifted) => shifted,
        Err(_) => span.clone(),
    }
}
