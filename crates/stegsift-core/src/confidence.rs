//! Multi-factor confidence scoring for signature matches. Each factor lands
//! in `[0, 1]` and contributes a fixed share of the final score, so a bare
//! magic number in the middle of pixel data cannot reach the reporting
//! threshold on its own.

use crate::entropy::shannon_entropy;
use crate::model::{DetectionMode, RiskTier};
use crate::signatures::SignatureMatch;
use crate::structure::structural_score;

const W_BASE: f64 = 0.20;
const W_CONTEXT: f64 = 0.30;
const W_STRUCTURE: f64 = 0.25;
const W_SIZE: f64 = 0.15;
const W_ENTROPY: f64 = 0.10;

/// Confidence at or above this raises low and medium risk one tier.
const PROMOTION_BAR: f64 = 0.85;

/// Bytes sampled for the entropy factor.
const ENTROPY_WINDOW: usize = 1024;

/// Bytes inspected around a match for repeating pixel patterns.
const PATTERN_WINDOW: usize = 256;

/// Scored verdict for one signature match.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub confidence: f64,
    pub risk: RiskTier,
    pub details: Vec<String>,
}

pub struct ConfidenceScorer {
    mode: DetectionMode,
    context_validation: bool,
}

impl ConfidenceScorer {
    pub fn new(mode: DetectionMode) -> Self {
        Self { mode, context_validation: mode.context_validation_enabled() }
    }

    /// Force the context factor on or off independently of the mode.
    pub fn set_context_validation(&mut self, enabled: bool) {
        self.context_validation = enabled;
    }

    /// Combine context, structure, size and entropy evidence for a match.
    /// `terminator_end` is the offset one past the carrier's terminator when
    /// one was found; matches at or beyond it sit in appended data.
    pub fn assess(
        &self,
        bytes: &[u8],
        terminator_end: Option<usize>,
        m: &SignatureMatch,
    ) -> Assessment {
        let context = self.context_factor(bytes, terminator_end, m.offset);
        let size = self.size_factor(bytes.len(), m);
        let window_end = m.offset.saturating_add(ENTROPY_WINDOW).min(bytes.len());
        let entropy = shannon_entropy(&bytes[m.offset..window_end]);

        let mut confidence = W_BASE + W_CONTEXT * context + W_SIZE * size + W_ENTROPY * entropy;
        let mut details = Vec::new();
        if self.mode.structure_validation_enabled() {
            let structure = structural_score(bytes, m.signature, m.offset);
            confidence += W_STRUCTURE * structure;
            details.push(format!(
                "factors: context {:.2}, structure {:.2}, size {:.2}, entropy {:.2}",
                context, structure, size, entropy
            ));
        } else {
            details.push(format!(
                "factors: context {:.2}, size {:.2}, entropy {:.2}",
                context, size, entropy
            ));
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let base = m.signature.class.base_risk();
        let risk = promoted_risk(base, confidence);
        if risk != base {
            details.push(format!("risk promoted to {} at confidence {:.2}", risk.as_str(), confidence));
        }
        Assessment { confidence, risk, details }
    }

    fn context_factor(&self, bytes: &[u8], terminator_end: Option<usize>, offset: usize) -> f64 {
        if !self.context_validation {
            return 1.0;
        }
        if let Some(end) = terminator_end {
            if offset >= end {
                return 1.0;
            }
        }
        if offset < 1024 {
            // Header and metadata territory. Real embedded content (EXIF
            // thumbnails and the like) legitimately lives here.
            return 0.8;
        }
        (1.0 - repeating_pattern_score(bytes, offset)).clamp(0.0, 1.0)
    }

    fn size_factor(&self, len: usize, m: &SignatureMatch) -> f64 {
        let tier = match m.signature.class.base_risk() {
            RiskTier::Critical => 2.0,
            RiskTier::High => 1.5,
            RiskTier::Medium | RiskTier::Low => 1.0,
        };
        let need = m.signature.min_plausible_size as f64 * self.mode.size_factor() * tier;
        let remaining = len.saturating_sub(m.offset) as f64;
        if remaining >= need {
            1.0
        } else {
            0.0
        }
    }
}

fn promoted_risk(base: RiskTier, confidence: f64) -> RiskTier {
    if confidence < PROMOTION_BAR {
        return base;
    }
    match base {
        RiskTier::Low => RiskTier::Medium,
        RiskTier::Medium => RiskTier::High,
        other => other,
    }
}

/// How strongly the bytes around `offset` look like repeating RGB or RGBA
/// pixel runs. Compares consecutive stride-sized windows at strides 3 and 4
/// and returns the larger equality ratio.
fn repeating_pattern_score(bytes: &[u8], offset: usize) -> f64 {
    let start = offset.saturating_sub(PATTERN_WINDOW / 2);
    let end = start.saturating_add(PATTERN_WINDOW).min(bytes.len());
    let window = &bytes[start..end];
    let mut best: f64 = 0.0;
    for stride in [3usize, 4] {
        if window.len() < stride * 2 {
            continue;
        }
        let mut equal = 0usize;
        let mut total = 0usize;
        let mut i = 0usize;
        while i + stride * 2 <= window.len() {
            total += 1;
            if window[i..i + stride] == window[i + stride..i + stride * 2] {
                equal += 1;
            }
            i += stride;
        }
        if total > 0 {
            best = best.max(equal as f64 / total as f64);
        }
    }
    best
}
