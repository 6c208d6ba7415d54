//! Heuristic grading of trailing data behind the carrier terminator when no
//! specific signature survived scoring there. Camera firmware pads with
//! nulls, editors append short text blocks; neither should alarm anyone,
//! while a high-entropy blob should.

use crate::confidence::Assessment;
use crate::entropy::shannon_entropy;
use crate::model::{RiskTier, ScanRegion};
use crate::signatures::ByteSignatureIndex;

/// Bytes of the region sampled for entropy and null statistics.
const STATS_WINDOW: usize = 4096;

/// Bytes of the region searched for embedded magics.
const MAGIC_WINDOW: usize = 8192;

/// Grade a trailing region as a whole. The resulting confidence is gated by
/// the caller against the mode threshold like any signature match.
pub fn assess_appended(
    bytes: &[u8],
    region: ScanRegion,
    index: &ByteSignatureIndex,
) -> Assessment {
    let start = region.start.min(bytes.len());
    let end = region.end.min(bytes.len());
    if start >= end {
        return Assessment { confidence: 0.0, risk: RiskTier::Low, details: Vec::new() };
    }
    let tail = &bytes[start..end];

    let stats = &tail[..tail.len().min(STATS_WINDOW)];
    let entropy = shannon_entropy(stats);
    let nulls = stats.iter().filter(|&&b| b == 0).count();
    let null_ratio = nulls as f64 / stats.len() as f64;

    let magic_window = ScanRegion {
        start,
        end: start.saturating_add(MAGIC_WINDOW).min(end),
        kind: region.kind,
    };
    let has_magic = !index.scan_region(bytes, magic_window).is_empty();

    let mut confidence = 0.2 + (1.0 - null_ratio) * 0.2 + entropy * 0.3;
    let mut risk = RiskTier::Low;
    if entropy > 0.75 {
        risk = RiskTier::Medium;
    }
    let mut details = vec![
        format!("trailing bytes: {}", tail.len()),
        format!("entropy {:.2}, null ratio {:.2}", entropy, null_ratio),
    ];
    if has_magic {
        confidence += 0.3;
        risk = RiskTier::High;
        details.push("embedded signature inside trailing data".to_string());
    }
    Assessment { confidence: confidence.clamp(0.0, 1.0), risk, details }
}
