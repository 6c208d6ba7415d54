#![forbid(unsafe_code)]

//! Detection engine for data hidden in image files.
//!
//! The engine works in two layers. Byte-level stages need nothing but the
//! raw file: carrier sniffing, terminator location, signature scanning over
//! mode-planned regions, confidence scoring and trailing-data grading.
//! Pixel-level stages (LSB extraction and the statistical tests) run only
//! when the caller supplies a [`pixels::PixelDecoder`], and their failure
//! never suppresses byte-level findings.
//!
//! [`analyzer::analyze`] is the front door; everything below it is public
//! for callers that want to drive individual stages.

pub mod analyzer;
pub mod appended;
pub mod config;
pub mod confidence;
pub mod entropy;
pub mod lsb;
pub mod model;
pub mod pixels;
pub mod report;
pub mod scanner;
pub mod signatures;
pub mod stats;
pub mod structure;
pub mod terminator;
pub mod threat;
pub mod timeout;

pub use analyzer::{analyze, AnalyzerOptions};
pub use model::{AnalysisResult, DetectionMode, Finding, RiskTier, ThreatLevel};
pub use pixels::{DecodeError, PixelBuffer, PixelDecoder};
pub use terminator::ImageFormat;
