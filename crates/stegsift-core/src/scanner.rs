//! Region planning and signature scanning. The mode decides how much of the
//! input is worth searching; everything found is pushed through the
//! confidence scorer and gated against the reporting threshold.

use crate::appended::assess_appended;
use crate::confidence::ConfidenceScorer;
use crate::model::{DetectionMode, Finding, RegionKind, ScanRegion};
use crate::signatures::{ByteSignatureIndex, Signature};
use crate::terminator::{ImageFormat, TerminatorScan};

/// Header window searched by balanced mode when the carrier has no
/// recognizable terminator.
const LIMITED_PREFIX_BYTES: usize = 64 * 1024;

/// Whole-input cap for aggressive mode.
const FULL_SCAN_BYTES: usize = 256 * 1024;

/// Cap on the trailing region behind the terminator.
const APPENDED_SCAN_BYTES: usize = 16 * 1024 * 1024;

/// Name given to the catch-all trailing-data finding.
pub const APPENDED_DATA: &str = "appended-data";

/// Plan which byte ranges get scanned. Conservative trusts the terminator
/// and looks only behind it. Balanced falls back to a bounded header window
/// when no terminator exists. Aggressive sweeps a capped prefix of the whole
/// input on top of the trailing region.
pub fn select_regions(
    len: usize,
    terminator_end: Option<usize>,
    mode: DetectionMode,
) -> Vec<ScanRegion> {
    let appended = terminator_end.and_then(|end| {
        if end >= len {
            return None;
        }
        Some(ScanRegion {
            start: end,
            end: end.saturating_add(APPENDED_SCAN_BYTES).min(len),
            kind: RegionKind::Appended,
        })
    });
    match mode {
        DetectionMode::Conservative => appended.into_iter().collect(),
        DetectionMode::Balanced => match appended {
            Some(region) => vec![region],
            None => vec![ScanRegion {
                start: 0,
                end: len.min(LIMITED_PREFIX_BYTES),
                kind: RegionKind::Limited,
            }],
        },
        DetectionMode::Aggressive => {
            let mut regions = vec![ScanRegion {
                start: 0,
                end: len.min(FULL_SCAN_BYTES),
                kind: RegionKind::Full,
            }];
            regions.extend(appended);
            regions
        }
    }
}

pub struct SignatureScanner {
    index: ByteSignatureIndex,
    scorer: ConfidenceScorer,
    mode: DetectionMode,
    threshold: f64,
}

impl SignatureScanner {
    pub fn new(mode: DetectionMode) -> Self {
        Self::with_threshold(mode, mode.confidence_threshold())
    }

    /// Same scanner with the reporting threshold overridden, for callers
    /// that want balanced-mode region planning with their own bar.
    pub fn with_threshold(mode: DetectionMode, threshold: f64) -> Self {
        Self {
            index: ByteSignatureIndex::builtin(),
            scorer: ConfidenceScorer::new(mode),
            mode,
            threshold,
        }
    }

    pub fn set_context_validation(&mut self, enabled: bool) {
        self.scorer.set_context_validation(enabled);
    }

    pub fn signatures(&self) -> &'static [Signature] {
        self.index.signatures()
    }

    /// Scan the planned regions and return every finding at or above the
    /// threshold, sorted by offset and deduplicated across regions.
    pub fn scan(
        &self,
        bytes: &[u8],
        format: Option<ImageFormat>,
        terminator: &TerminatorScan,
    ) -> Vec<Finding> {
        let regions = select_regions(bytes.len(), terminator.end, self.mode);
        let mut findings = Vec::new();
        let mut appended_region = None;
        for region in regions {
            if region.kind == RegionKind::Appended {
                appended_region = Some(region);
            }
            for m in self.index.scan_region(bytes, region) {
                if m.offset == 0 && is_carrier_match(m.signature, format) {
                    continue;
                }
                let assessment = self.scorer.assess(bytes, terminator.end, &m);
                if assessment.confidence < self.threshold {
                    continue;
                }
                let mut finding = Finding::template(
                    m.signature.name,
                    m.offset,
                    assessment.risk,
                    assessment.confidence,
                );
                finding.details.push(format!("region: {}", region.kind.as_str()));
                finding.details.extend(assessment.details);
                finding.extensions =
                    m.signature.extensions.iter().map(|e| e.to_string()).collect();
                findings.push(finding);
            }
        }

        if let Some(region) = appended_region {
            let covered = findings.iter().any(|f| f.offset >= region.start);
            if !covered && !region.is_empty() {
                let assessment = assess_appended(bytes, region, &self.index);
                if assessment.confidence >= self.threshold {
                    let mut finding = Finding::template(
                        APPENDED_DATA,
                        region.start,
                        assessment.risk,
                        assessment.confidence,
                    );
                    finding.details.extend(assessment.details);
                    if terminator.occurrences > 1 {
                        finding
                            .details
                            .push(format!("{} image terminators present", terminator.occurrences));
                    }
                    findings.push(finding);
                }
            }
        }

        findings.sort_by(|a, b| {
            a.offset.cmp(&b.offset).then_with(|| a.signature.cmp(&b.signature))
        });
        findings.dedup_by(|a, b| a.offset == b.offset && a.signature == b.signature);
        findings
    }
}

fn is_carrier_match(signature: &Signature, format: Option<ImageFormat>) -> bool {
    match format {
        Some(ImageFormat::Png) => signature.name == "png",
        Some(ImageFormat::Jpeg) => signature.name == "jpeg",
        Some(ImageFormat::Gif) => matches!(signature.name, "gif87a" | "gif89a"),
        Some(ImageFormat::Bmp) | None => false,
    }
}
