//! Folds findings and statistics into the single threat level a caller can
//! route on. Rules are checked from most to least severe, so the input
//! order of findings never matters.

use crate::model::{Finding, RiskTier, StatisticalReport, ThreatLevel};

/// Confidence at which a finding counts as confirmed.
const CONFIRMED: f64 = 0.7;

/// Confidence at which a finding still registers at all.
const WEAK: f64 = 0.5;

/// How many confirmed findings of any tier escalate on their own.
const CORROBORATION_COUNT: usize = 2;

pub fn aggregate_threat(
    findings: &[Finding],
    statistics: Option<&StatisticalReport>,
) -> ThreatLevel {
    let stats_flagged = statistics
        .map(|s| s.chi_square.suspicious || s.sample_pairs.suspicious)
        .unwrap_or(false);

    if findings
        .iter()
        .any(|f| f.risk == RiskTier::Critical && f.confidence >= CONFIRMED)
    {
        return ThreatLevel::Critical;
    }
    if findings.iter().any(|f| f.risk == RiskTier::High && f.confidence >= CONFIRMED) {
        return ThreatLevel::High;
    }
    if findings.iter().filter(|f| f.confidence >= CONFIRMED).count() >= CORROBORATION_COUNT {
        return ThreatLevel::Medium;
    }
    if stats_flagged && findings.is_empty() {
        return ThreatLevel::Medium;
    }
    if findings.iter().any(|f| f.confidence >= WEAK) {
        return ThreatLevel::Low;
    }
    ThreatLevel::Safe
}
