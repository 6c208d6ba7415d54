use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Safe => "safe",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }
}

/// Detection mode, carried as data through every scan call. Each mode fixes a
/// default confidence threshold and whether context validation runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl DetectionMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "conservative" => Some(DetectionMode::Conservative),
            "balanced" => Some(DetectionMode::Balanced),
            "aggressive" => Some(DetectionMode::Aggressive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMode::Conservative => "conservative",
            DetectionMode::Balanced => "balanced",
            DetectionMode::Aggressive => "aggressive",
        }
    }

    pub fn confidence_threshold(&self) -> f64 {
        match self {
            DetectionMode::Conservative => 0.8,
            DetectionMode::Balanced => 0.6,
            DetectionMode::Aggressive => 0.4,
        }
    }

    pub fn context_validation_enabled(&self) -> bool {
        !matches!(self, DetectionMode::Aggressive)
    }

    /// Structural header confirmation is skipped in aggressive mode, which
    /// trades precision for surface.
    pub fn structure_validation_enabled(&self) -> bool {
        !matches!(self, DetectionMode::Aggressive)
    }

    /// Multiplier applied to a signature's minimum plausible size before the
    /// size factor is awarded.
    pub fn size_factor(&self) -> f64 {
        match self {
            DetectionMode::Conservative => 2.0,
            DetectionMode::Balanced => 1.0,
            DetectionMode::Aggressive => 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Appended,
    Full,
    Limited,
}

impl RegionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Appended => "appended",
            RegionKind::Full => "full",
            RegionKind::Limited => "limited",
        }
    }
}

/// A byte range selected for signature scanning. Transient, one run only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
pub struct ScanRegion {
    pub start: usize,
    pub end: usize,
    pub kind: RegionKind,
}

impl ScanRegion {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub signature: String,
    pub offset: usize,
    pub risk: RiskTier,
    pub confidence: f64,
    pub details: Vec<String>,
    pub extensions: Vec<String>,
}

impl Default for Finding {
    fn default() -> Self {
        Self {
            signature: String::new(),
            offset: 0,
            risk: RiskTier::Low,
            confidence: 0.0,
            details: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl Finding {
    pub fn template(
        signature: impl Into<String>,
        offset: usize,
        risk: RiskTier,
        confidence: f64,
    ) -> Self {
        let mut base = Finding::default();
        base.signature = signature.into();
        base.offset = offset;
        base.risk = risk;
        base.confidence = confidence;
        base
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChiSquareResult {
    pub statistic: f64,
    pub p_value: f64,
    pub suspicious: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SamplePairsResult {
    pub ratio: f64,
    pub suspicious: bool,
}

/// Outcome of the two LSB anomaly tests over a bounded pixel sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StatisticalReport {
    pub chi_square: ChiSquareResult,
    pub sample_pairs: SamplePairsResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LsbCandidate {
    pub method: String,
    /// Printable preview, control characters escaped, bounded.
    pub preview: String,
    pub length: usize,
    /// True when the candidate came from a null-terminated printable run
    /// rather than the loose all-printable fallback.
    pub terminated: bool,
}

/// Per-method extraction outcomes. A method with no candidate is simply
/// absent; extraction never reports success or failure as a verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LsbReport {
    pub candidates: Vec<LsbCandidate>,
    pub suspected_methods: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMeta {
    pub path: Option<String>,
    pub length: u64,
    pub sha256: String,
    pub declared_format: Option<String>,
    pub detected_format: String,
    pub mode: String,
    pub threshold: f64,
    pub duration_ms: u64,
    pub engine_version: String,
}

/// One analysis run over one file. Replaced wholesale on the next submission,
/// never patched in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub findings: Vec<Finding>,
    pub threat_level: ThreatLevel,
    pub lsb_report: Option<LsbReport>,
    pub statistical_report: Option<StatisticalReport>,
    pub errors: Vec<String>,
    pub meta: SourceMeta,
}

impl AnalysisResult {
    pub fn empty(meta: SourceMeta) -> Self {
        Self {
            findings: Vec::new(),
            threat_level: ThreatLevel::Safe,
            lsb_report: None,
            statistical_report: None,
            errors: Vec::new(),
            meta,
        }
    }
}
