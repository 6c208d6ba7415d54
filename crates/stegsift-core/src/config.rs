//! TOML configuration. Every field is optional; absent fields keep the
//! built-in defaults, out-of-range values are clamped or ignored with a
//! warning rather than failing the run.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::analyzer::AnalyzerOptions;
use crate::lsb::LsbOptions;
use crate::model::DetectionMode;
use crate::stats::StatsOptions;

/// Configs larger than this are refused outright.
const MAX_CONFIG_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanSection,
    pub lsb: LsbSection,
    pub stats: StatsSection,
    pub decode: DecodeSection,
    /// Named presets selectable with `--profile`; each overrides the base
    /// `[scan]` section.
    pub profiles: BTreeMap<String, ScanSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub mode: Option<DetectionMode>,
    pub confidence_threshold: Option<f64>,
    pub lsb: Option<bool>,
    pub stats: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LsbSection {
    pub max_payload_bytes: Option<usize>,
    pub min_text_run: Option<usize>,
    pub preview_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsSection {
    pub max_sample_pixels: Option<usize>,
    pub closeness: Option<u8>,
}

/// Raw numbers for the codec layer; the pixel buffer cap still applies on
/// top of whatever is configured here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DecodeSection {
    pub max_pixels: Option<u64>,
    pub max_input_bytes: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("config not readable: {}", path.display()))?;
        if meta.len() > MAX_CONFIG_BYTES {
            bail!(
                "config {} is {} bytes, limit is {}",
                path.display(),
                meta.len(),
                MAX_CONFIG_BYTES
            );
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("config not readable: {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("config not parseable: {}", path.display()))?;
        Ok(config)
    }

    /// Fold the file into `options`, base `[scan]` first, then the selected
    /// profile. An unknown profile name is an error; a bad value inside a
    /// known section is not.
    pub fn apply(&self, profile: Option<&str>, options: &mut AnalyzerOptions) -> Result<()> {
        self.scan.apply(options);
        self.lsb.apply(&mut options.lsb);
        self.stats.apply(&mut options.stats);
        if let Some(name) = profile {
            let section = self
                .profiles
                .get(name)
                .ok_or_else(|| anyhow!("unknown profile: {}", name))?;
            section.apply(options);
        }
        Ok(())
    }
}

impl ScanSection {
    pub fn apply(&self, options: &mut AnalyzerOptions) {
        if let Some(mode) = self.mode {
            options.mode = mode;
        }
        if let Some(threshold) = self.confidence_threshold {
            if (0.0..=1.0).contains(&threshold) {
                options.confidence_threshold = Some(threshold);
            } else {
                warn!(threshold, "confidence_threshold outside [0, 1], ignored");
            }
        }
        if let Some(enabled) = self.lsb {
            options.lsb_enabled = enabled;
        }
        if let Some(enabled) = self.stats {
            options.stats_enabled = enabled;
        }
    }
}

impl LsbSection {
    pub fn apply(&self, options: &mut LsbOptions) {
        if let Some(value) = self.max_payload_bytes {
            options.max_payload_bytes = clamped("lsb.max_payload_bytes", value, 16, 1 << 20);
        }
        if let Some(value) = self.min_text_run {
            options.min_text_run = clamped("lsb.min_text_run", value, 2, 256);
        }
        if let Some(value) = self.preview_chars {
            options.preview_chars = clamped("lsb.preview_chars", value, 8, 1024);
        }
    }
}

impl StatsSection {
    pub fn apply(&self, options: &mut StatsOptions) {
        if let Some(value) = self.max_sample_pixels {
            options.max_sample_pixels = clamped("stats.max_sample_pixels", value, 64, 1 << 24);
        }
        if let Some(value) = self.closeness {
            options.closeness = clamped("stats.closeness", value, 0, 16);
        }
    }
}

fn clamped<T: Ord + Copy + std::fmt::Display>(field: &str, value: T, lo: T, hi: T) -> T {
    let out = value.clamp(lo, hi);
    if out != value {
        warn!(field, %value, clamped = %out, "config value out of range");
    }
    out
}
