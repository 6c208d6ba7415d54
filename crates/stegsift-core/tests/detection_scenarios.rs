//! End-to-end detection scenarios over synthetic carriers: appended
//! archives, mid-file payloads, mode contrast, pixel-stage outcomes.

mod common;

use common::{filler, idat_body_offset, synthetic_png, zip_payload};
use stegsift_core::entropy::shannon_entropy;
use stegsift_core::{
    analyze, AnalyzerOptions, DecodeError, DetectionMode, PixelBuffer, PixelDecoder, RiskTier,
    ThreatLevel,
};

fn options(mode: DetectionMode) -> AnalyzerOptions {
    AnalyzerOptions { mode, ..AnalyzerOptions::default() }
}

struct FailingDecoder;

impl PixelDecoder for FailingDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
        Err(DecodeError::Timeout { budget_ms: 250 })
    }
}

/// Hands back a fixed pixel buffer regardless of the input bytes.
struct CannedDecoder {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl PixelDecoder for CannedDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
        PixelBuffer::new(self.width, self.height, self.rgba.clone())
            .map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

/// `message` in the standard LSB layout over a flat gray base, one bit per
/// channel, remaining bits zero.
fn embed_standard(message: &[u8], pixel_count: usize) -> CannedDecoder {
    let mut bits = Vec::new();
    for &byte in message {
        for k in (0..8).rev() {
            bits.push((byte >> k) & 1);
        }
    }
    let mut rgba = Vec::with_capacity(pixel_count * 4);
    let mut cursor = 0usize;
    for _ in 0..pixel_count {
        for _ in 0..3 {
            let bit = bits.get(cursor).copied().unwrap_or(0);
            cursor += 1;
            rgba.push(0x80 | bit);
        }
        rgba.push(0xff);
    }
    CannedDecoder { width: pixel_count as u32, height: 1, rgba }
}

#[test]
fn appended_zip_scores_high_in_balanced() {
    let mut bytes = synthetic_png(&filler(10_000));
    let offset = bytes.len();
    bytes.extend_from_slice(&zip_payload(50_000));

    let result = analyze(&bytes, None, None, &AnalyzerOptions::default());
    assert_eq!(result.meta.detected_format, "png");
    assert_eq!(result.findings.len(), 1);

    let finding = &result.findings[0];
    assert_eq!(finding.signature, "zip");
    assert_eq!(finding.offset, offset);
    assert_eq!(finding.risk, RiskTier::High);
    assert!(finding.details.iter().any(|d| d == "region: appended"));

    // Context 1.0 behind the terminator, structure 0.8 for a plausible
    // local header, size 1.0; only the entropy share varies with the
    // filler.
    let window = &bytes[offset..(offset + 1024).min(bytes.len())];
    let expected = 0.85 + 0.10 * shannon_entropy(window);
    assert!((finding.confidence - expected).abs() < 1e-9);
    assert_eq!(result.threat_level, ThreatLevel::High);
}

#[test]
fn conservative_clears_its_higher_bar_on_the_same_file() {
    let mut bytes = synthetic_png(&filler(10_000));
    let offset = bytes.len();
    bytes.extend_from_slice(&zip_payload(50_000));

    let result = analyze(&bytes, None, None, &options(DetectionMode::Conservative));
    assert!((result.meta.threshold - 0.8).abs() < f64::EPSILON);
    assert_eq!(result.findings.len(), 1);

    // Same factor mix as balanced; only the size requirement scales, and
    // fifty kilobytes clears it in every mode.
    let window = &bytes[offset..(offset + 1024).min(bytes.len())];
    let expected = 0.85 + 0.10 * shannon_entropy(window);
    assert!(expected >= 0.8);
    assert!((result.findings[0].confidence - expected).abs() < 1e-9);
    assert_eq!(result.findings[0].risk, RiskTier::High);
}

#[test]
fn conservative_without_terminator_stays_silent() {
    // Unknown format, no terminator: conservative plans no regions at all,
    // so even a blatant archive in the middle goes unreported.
    let mut bytes = filler(10_000);
    bytes.extend_from_slice(&zip_payload(20_000));
    bytes.extend_from_slice(&filler(10_000));

    let result = analyze(&bytes, None, None, &options(DetectionMode::Conservative));
    assert!(result.findings.is_empty());
    assert_eq!(result.threat_level, ThreatLevel::Safe);
    assert_eq!(result.meta.detected_format, "unknown");
}

#[test]
fn clean_png_reports_safe() {
    let bytes = synthetic_png(&filler(10_000));
    let result = analyze(&bytes, None, None, &AnalyzerOptions::default());
    assert!(result.findings.is_empty());
    assert_eq!(result.threat_level, ThreatLevel::Safe);
    assert!(result.errors.is_empty());
    assert_eq!(result.meta.length, bytes.len() as u64);
}

#[test]
fn repeat_runs_are_deterministic() {
    let mut bytes = synthetic_png(&filler(5_000));
    bytes.extend_from_slice(&zip_payload(20_000));
    let opts = AnalyzerOptions::default();

    let first = analyze(&bytes, None, None, &opts);
    let second = analyze(&bytes, None, None, &opts);
    assert_eq!(
        serde_json::to_string(&first.findings).expect("serialize"),
        serde_json::to_string(&second.findings).expect("serialize")
    );
    assert_eq!(first.threat_level, second.threat_level);
    assert_eq!(first.meta.sha256, second.meta.sha256);
}

#[test]
fn mid_file_payload_splits_the_modes() {
    // The archive sits inside IDAT, before the terminator. Conservative
    // trusts the terminator and never sees it; aggressive sweeps the prefix.
    let zip = zip_payload(20_000);
    let mut body = filler(2_000);
    body.extend_from_slice(&zip);
    body.extend_from_slice(&filler(2_000));
    let bytes = synthetic_png(&body);
    let offset = idat_body_offset() + 2_000;

    let conservative = analyze(&bytes, None, None, &options(DetectionMode::Conservative));
    assert!(conservative.findings.is_empty());
    assert_eq!(conservative.threat_level, ThreatLevel::Safe);

    let aggressive = analyze(&bytes, None, None, &options(DetectionMode::Aggressive));
    assert!(aggressive
        .findings
        .iter()
        .any(|f| f.signature == "zip" && f.offset == offset));
}

#[test]
fn aggressive_findings_cover_balanced_findings() {
    let mut bytes = synthetic_png(&filler(10_000));
    bytes.extend_from_slice(&zip_payload(30_000));

    let balanced = analyze(&bytes, None, None, &options(DetectionMode::Balanced));
    let aggressive = analyze(&bytes, None, None, &options(DetectionMode::Aggressive));
    assert!(!balanced.findings.is_empty());
    for finding in &balanced.findings {
        assert!(
            aggressive
                .findings
                .iter()
                .any(|f| f.signature == finding.signature && f.offset == finding.offset),
            "{} at {} missing in aggressive",
            finding.signature,
            finding.offset
        );
    }
}

#[test]
fn raised_threshold_suppresses_everything() {
    let mut bytes = synthetic_png(&filler(10_000));
    bytes.extend_from_slice(&zip_payload(30_000));
    let opts = AnalyzerOptions {
        confidence_threshold: Some(0.95),
        ..AnalyzerOptions::default()
    };

    let result = analyze(&bytes, None, None, &opts);
    assert!(result.findings.is_empty());
    assert_eq!(result.threat_level, ThreatLevel::Safe);
    assert!((result.meta.threshold - 0.95).abs() < f64::EPSILON);
}

#[test]
fn decoder_failure_is_an_error_not_a_threat() {
    let bytes = synthetic_png(&filler(4_000));
    let result = analyze(&bytes, None, Some(&FailingDecoder), &AnalyzerOptions::default());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("pixel decode not completed"));
    assert!(result.lsb_report.is_none());
    assert_eq!(result.threat_level, ThreatLevel::Safe);
}

#[test]
fn lsb_message_surfaces_in_the_report() {
    let bytes = synthetic_png(&filler(4_000));
    let decoder = embed_standard(b"meet at the old pier at dawn", 400);
    let result = analyze(&bytes, None, Some(&decoder), &AnalyzerOptions::default());

    let lsb = result.lsb_report.expect("lsb report");
    assert!(lsb.suspected_methods.contains(&"standard".to_string()));
    let hit = lsb
        .candidates
        .iter()
        .find(|c| c.method == "standard")
        .expect("standard candidate");
    assert!(hit.terminated);
    assert!(hit.preview.contains("old pier"));
}

#[test]
fn shaped_lsb_plane_alone_raises_medium() {
    // No byte-level findings, but every sampled LSB is zero: chi-square
    // flags the plane and the verdict climbs to medium on statistics alone.
    let bytes = synthetic_png(&filler(4_000));
    let rgba: Vec<u8> = (0..512).flat_map(|_| [0x80u8, 0x80, 0x80, 0xff]).collect();
    let decoder = CannedDecoder { width: 512, height: 1, rgba };
    let result = analyze(&bytes, None, Some(&decoder), &AnalyzerOptions::default());

    assert!(result.findings.is_empty());
    let stats = result.statistical_report.expect("statistics");
    assert!(stats.chi_square.suspicious);
    assert_eq!(result.threat_level, ThreatLevel::Medium);
}
