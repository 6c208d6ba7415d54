//! Rendering of analysis results for people and for pipelines.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use crate::model::{AnalysisResult, Finding, RiskTier};

/// Finding counts by risk tier.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl Summary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Summary { total: findings.len(), ..Summary::default() };
        for finding in findings {
            match finding.risk {
                RiskTier::Critical => summary.critical += 1,
                RiskTier::High => summary.high += 1,
                RiskTier::Medium => summary.medium += 1,
                RiskTier::Low => summary.low += 1,
            }
        }
        summary
    }
}

/// Replace control characters so extracted previews cannot mangle a
/// terminal.
pub fn escape_control(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_control() {
            out.push_str(&format!("\\x{:02x}", ch as u32));
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn print_human(result: &AnalysisResult, out: &mut dyn Write) -> Result<()> {
    let meta = &result.meta;
    writeln!(out, "target: {}", meta.path.as_deref().unwrap_or("-"))?;
    match &meta.declared_format {
        Some(declared) if *declared != meta.detected_format => {
            writeln!(out, "format: {} (declared {})", meta.detected_format, declared)?;
        }
        _ => writeln!(out, "format: {}", meta.detected_format)?,
    }
    writeln!(out, "sha256: {}", meta.sha256)?;
    writeln!(out, "threat: {}", result.threat_level.as_str())?;

    let summary = Summary::from_findings(&result.findings);
    writeln!(
        out,
        "findings: {} ({} critical, {} high, {} medium, {} low)",
        summary.total, summary.critical, summary.high, summary.medium, summary.low
    )?;
    for finding in &result.findings {
        writeln!(
            out,
            "  [{}] {} at offset {} (confidence {:.2})",
            finding.risk.as_str(),
            finding.signature,
            finding.offset,
            finding.confidence
        )?;
        for detail in &finding.details {
            writeln!(out, "      {}", escape_control(detail))?;
        }
        if !finding.extensions.is_empty() {
            writeln!(out, "      extensions: {}", finding.extensions.join(", "))?;
        }
    }

    if let Some(lsb) = &result.lsb_report {
        writeln!(out, "lsb candidates: {}", lsb.candidates.len())?;
        for candidate in &lsb.candidates {
            writeln!(
                out,
                "  [{}] {} bytes{} \"{}\"",
                candidate.method,
                candidate.length,
                if candidate.terminated { ", terminated" } else { "" },
                escape_control(&candidate.preview)
            )?;
        }
        if !lsb.suspected_methods.is_empty() {
            writeln!(out, "  suspected methods: {}", lsb.suspected_methods.join(", "))?;
        }
    }

    if let Some(stats) = &result.statistical_report {
        writeln!(
            out,
            "chi-square: {:.2} (p {:.4}{})",
            stats.chi_square.statistic,
            stats.chi_square.p_value,
            if stats.chi_square.suspicious { ", suspicious" } else { "" }
        )?;
        writeln!(
            out,
            "sample pairs: ratio {:.3}{}",
            stats.sample_pairs.ratio,
            if stats.sample_pairs.suspicious { ", suspicious" } else { "" }
        )?;
    }

    for error in &result.errors {
        writeln!(out, "warning: {}", error)?;
    }
    writeln!(out, "completed in {} ms ({} bytes)", meta.duration_ms, meta.length)?;
    Ok(())
}

/// Whole result as one pretty JSON document.
pub fn print_json(result: &AnalysisResult, out: &mut dyn Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, result)?;
    writeln!(out)?;
    Ok(())
}

/// One JSON object per finding followed by a closing summary record,
/// suitable for line-oriented collectors. The file context rides along on
/// every line.
pub fn print_jsonl(result: &AnalysisResult, out: &mut dyn Write) -> Result<()> {
    for finding in &result.findings {
        let line = json!({
            "record": "finding",
            "path": result.meta.path,
            "sha256": result.meta.sha256,
            "threat": result.threat_level.as_str(),
            "signature": finding.signature,
            "offset": finding.offset,
            "risk": finding.risk.as_str(),
            "confidence": finding.confidence,
            "details": finding.details,
            "extensions": finding.extensions,
        });
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    }
    let summary = json!({
        "record": "summary",
        "path": result.meta.path,
        "sha256": result.meta.sha256,
        "threat": result.threat_level.as_str(),
        "findings": Summary::from_findings(&result.findings),
        "errors": result.errors.len(),
        "duration_ms": result.meta.duration_ms,
    });
    serde_json::to_writer(&mut *out, &summary)?;
    writeln!(out)?;
    Ok(())
}
