use serde::{Deserialize, Serialize};

use crate::signatures::find_all;

/// Carrier formats the engine understands at the byte level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

/// Full IEND chunk: zero length, chunk type, fixed CRC.
const PNG_IEND: &[u8] = b"\x00\x00\x00\x00IEND\xae\x42\x60\x82";
const JPEG_EOI: &[u8] = b"\xff\xd9";
const GIF_TRAILER: u8 = 0x3b;

impl ImageFormat {
    /// Identify the carrier from its leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(b"\xff\xd8\xff") {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.starts_with(b"BM") {
            Some(Self::Bmp)
        } else {
            None
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        }
    }
}

/// Where the carrier's own data ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminatorScan {
    /// Offset one past the format terminator, or `None` when the format has
    /// no terminator (BMP) or the terminator is absent.
    pub end: Option<usize>,
    /// How many terminator markers occur in the whole input. More than one
    /// is itself a signal that something sits behind the image.
    pub occurrences: usize,
}

/// Locate the end-of-image terminator for `format`.
///
/// PNG scans forward and stops at the first complete IEND chunk, so a second
/// image appended behind the carrier stays inside the trailing region. JPEG
/// scans backward for the last EOI marker because embedded thumbnails carry
/// their own EOI and a forward scan would cut the image short. GIF takes the
/// last trailer byte.
pub fn locate_terminator(bytes: &[u8], format: ImageFormat) -> TerminatorScan {
    match format {
        ImageFormat::Png => {
            let hits = find_all(bytes, PNG_IEND);
            TerminatorScan {
                end: hits.first().map(|i| i + PNG_IEND.len()),
                occurrences: hits.len(),
            }
        }
        ImageFormat::Jpeg => {
            let hits = find_all(bytes, JPEG_EOI);
            TerminatorScan {
                end: hits.last().map(|i| i + JPEG_EOI.len()),
                occurrences: hits.len(),
            }
        }
        ImageFormat::Gif => {
            let last = bytes.iter().rposition(|&b| b == GIF_TRAILER);
            TerminatorScan {
                end: last.map(|i| i + 1),
                occurrences: bytes.iter().filter(|&&b| b == GIF_TRAILER).count(),
            }
        }
        ImageFormat::Bmp => TerminatorScan { end: None, occurrences: 0 },
    }
}
