//! One-shot analysis orchestration. Byte-level stages always run; pixel
//! stages run when a decoder collaborator is supplied and are allowed to
//! fail without taking the byte-level verdict down with them.

use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, info_span, warn};

use crate::lsb::{LsbExtractor, LsbOptions};
use crate::model::{AnalysisResult, DetectionMode, SourceMeta};
use crate::pixels::PixelDecoder;
use crate::scanner::SignatureScanner;
use crate::stats::{run_statistics, StatsOptions};
use crate::terminator::{locate_terminator, ImageFormat, TerminatorScan};
use crate::threat::aggregate_threat;

#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    pub mode: DetectionMode,
    /// Overrides the mode's reporting threshold when set.
    pub confidence_threshold: Option<f64>,
    /// Overrides the mode's context validation default when set.
    pub context_validation: Option<bool>,
    pub lsb_enabled: bool,
    pub stats_enabled: bool,
    pub lsb: LsbOptions,
    pub stats: StatsOptions,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            mode: DetectionMode::default(),
            confidence_threshold: None,
            context_validation: None,
            lsb_enabled: true,
            stats_enabled: true,
            lsb: LsbOptions::default(),
            stats: StatsOptions::default(),
        }
    }
}

impl AnalyzerOptions {
    pub fn effective_threshold(&self) -> f64 {
        self.confidence_threshold.unwrap_or_else(|| self.mode.confidence_threshold())
    }
}

/// Analyze one input in full. The result stands alone; nothing is retained
/// between calls, so re-submitting a changed file simply produces a fresh
/// result.
pub fn analyze(
    bytes: &[u8],
    declared: Option<ImageFormat>,
    decoder: Option<&dyn PixelDecoder>,
    options: &AnalyzerOptions,
) -> AnalysisResult {
    let started = Instant::now();
    let span = info_span!("analyze", len = bytes.len(), mode = options.mode.as_str());
    let _guard = span.enter();

    let detected = ImageFormat::sniff(bytes);
    if let (Some(d), Some(s)) = (declared, detected) {
        if d != s {
            warn!(declared = d.as_str(), detected = s.as_str(), "format mismatch");
        }
    }
    // Content wins over the declared hint; the hint only fills in when the
    // magic is unrecognizable.
    let format = detected.or(declared);
    let terminator = match format {
        Some(f) => locate_terminator(bytes, f),
        None => TerminatorScan { end: None, occurrences: 0 },
    };
    debug!(?format, terminator_end = ?terminator.end, "carrier inspected");

    let threshold = options.effective_threshold();
    let mut scanner = SignatureScanner::with_threshold(options.mode, threshold);
    if let Some(enabled) = options.context_validation {
        scanner.set_context_validation(enabled);
    }
    let findings = scanner.scan(bytes, detected, &terminator);
    debug!(findings = findings.len(), "signature scan done");

    let mut errors = Vec::new();
    let mut lsb_report = None;
    let mut statistical_report = None;
    if options.lsb_enabled || options.stats_enabled {
        match decoder {
            Some(decoder) => match decoder.decode(bytes) {
                Ok(pixels) => {
                    if options.lsb_enabled {
                        let extractor = LsbExtractor::new(options.lsb.clone());
                        lsb_report = Some(extractor.extract(&pixels));
                    }
                    if options.stats_enabled {
                        statistical_report = Some(run_statistics(&pixels, &options.stats));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "pixel decode failed");
                    errors.push(format!("pixel decode not completed: {}", e));
                }
            },
            None => debug!("no pixel decoder, pixel stages skipped"),
        }
    }

    let threat_level = aggregate_threat(&findings, statistical_report.as_ref());

    let meta = SourceMeta {
        path: None,
        length: bytes.len() as u64,
        sha256: hex::encode(Sha256::digest(bytes)),
        declared_format: declared.map(|f| f.as_str().to_string()),
        detected_format: detected.map(|f| f.as_str()).unwrap_or("unknown").to_string(),
        mode: options.mode.as_str().to_string(),
        threshold,
        duration_ms: started.elapsed().as_millis() as u64,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    AnalysisResult { findings, threat_level, lsb_report, statistical_report, errors, meta }
}
