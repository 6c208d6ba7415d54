#![forbid(unsafe_code)]

//! Codec collaborators for the detection engine. The engine core never
//! decodes images; this crate supplies a [`PixelDecoder`] backed by the
//! `png` and `jpeg-decoder` crates, each behind a feature so a stripped
//! build degrades to byte-level analysis instead of failing.

use std::time::Duration;

use tracing::debug;

use stegsift_core::pixels::{DecodeError, PixelBuffer, PixelDecoder};
use stegsift_core::terminator::ImageFormat;
use stegsift_core::timeout::TimeoutChecker;

/// Caps applied before and during decoding. Zero disables a cap.
#[derive(Debug, Clone)]
pub struct DecodeLimits {
    pub max_pixels: u64,
    pub max_input_bytes: u64,
    pub timeout_ms: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_pixels: 16_000_000,
            max_input_bytes: 64 * 1024 * 1024,
            timeout_ms: 250,
        }
    }
}

/// Decoder that dispatches on the input magic. Formats whose feature was
/// compiled out, and formats with no codec at all, come back as
/// [`DecodeError::Unavailable`] so the caller can tell "could not" from
/// "went wrong".
pub struct StandardDecoder {
    limits: DecodeLimits,
}

impl StandardDecoder {
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    fn ensure_pixels(&self, width: u32, height: u32) -> Result<(), DecodeError> {
        let pixels = width as u64 * height as u64;
        if self.limits.max_pixels > 0 && pixels > self.limits.max_pixels {
            return Err(DecodeError::TooLarge {
                what: "pixels",
                actual: pixels,
                limit: self.limits.max_pixels,
            });
        }
        Ok(())
    }

    fn checker(&self) -> Option<TimeoutChecker> {
        if self.limits.timeout_ms > 0 {
            Some(TimeoutChecker::new(Duration::from_millis(self.limits.timeout_ms), 1024))
        } else {
            None
        }
    }
}

impl Default for StandardDecoder {
    fn default() -> Self {
        Self::new(DecodeLimits::default())
    }
}

impl PixelDecoder for StandardDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
        if self.limits.max_input_bytes > 0 && bytes.len() as u64 > self.limits.max_input_bytes {
            return Err(DecodeError::TooLarge {
                what: "bytes",
                actual: bytes.len() as u64,
                limit: self.limits.max_input_bytes,
            });
        }
        let timeout = self.checker();
        match ImageFormat::sniff(bytes) {
            Some(ImageFormat::Png) => decode_png(self, bytes, timeout.as_ref()),
            Some(ImageFormat::Jpeg) => decode_jpeg(self, bytes, timeout.as_ref()),
            Some(format) => {
                debug!(format = format.as_str(), "no decoder for format");
                Err(DecodeError::Unavailable(format!("no {} decoder", format.as_str())))
            }
            None => Err(DecodeError::Unavailable("unrecognized image magic".to_string())),
        }
    }
}

fn checkpoint(timeout: Option<&TimeoutChecker>) -> Result<(), DecodeError> {
    if let Some(checker) = timeout {
        checker
            .check()
            .map_err(|e| DecodeError::Timeout { budget_ms: e.budget.as_millis() as u64 })?;
    }
    Ok(())
}

fn malformed(err: impl std::fmt::Display) -> DecodeError {
    DecodeError::Malformed(err.to_string())
}

#[cfg(feature = "png")]
fn decode_png(
    decoder: &StandardDecoder,
    bytes: &[u8],
    timeout: Option<&TimeoutChecker>,
) -> Result<PixelBuffer, DecodeError> {
    checkpoint(timeout)?;
    let mut reader = {
        let mut d = png::Decoder::new(std::io::Cursor::new(bytes));
        d.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        d.read_info().map_err(malformed)?
    };
    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    decoder.ensure_pixels(width, height)?;
    checkpoint(timeout)?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let output = reader.next_frame(&mut buf).map_err(malformed)?;
    checkpoint(timeout)?;
    let samples = &buf[..output.buffer_size()];
    let rgba = match output.color_type {
        png::ColorType::Rgba => samples.to_vec(),
        png::ColorType::Rgb => rgb_to_rgba(samples),
        png::ColorType::Grayscale => gray_to_rgba(samples),
        png::ColorType::GrayscaleAlpha => gray_alpha_to_rgba(samples),
        png::ColorType::Indexed => {
            return Err(DecodeError::Malformed("palette not expanded".to_string()))
        }
    };
    PixelBuffer::new(output.width, output.height, rgba).map_err(malformed)
}

#[cfg(not(feature = "png"))]
fn decode_png(
    _decoder: &StandardDecoder,
    _bytes: &[u8],
    _timeout: Option<&TimeoutChecker>,
) -> Result<PixelBuffer, DecodeError> {
    Err(DecodeError::Unavailable("png decoder not compiled in".to_string()))
}

#[cfg(feature = "jpeg")]
fn decode_jpeg(
    decoder: &StandardDecoder,
    bytes: &[u8],
    timeout: Option<&TimeoutChecker>,
) -> Result<PixelBuffer, DecodeError> {
    checkpoint(timeout)?;
    let mut jpeg = jpeg_decoder::Decoder::new(bytes);
    jpeg.read_info().map_err(malformed)?;
    let info = jpeg
        .info()
        .ok_or_else(|| DecodeError::Malformed("jpeg header carries no info".to_string()))?;
    decoder.ensure_pixels(info.width as u32, info.height as u32)?;
    checkpoint(timeout)?;

    let samples = jpeg.decode().map_err(malformed)?;
    checkpoint(timeout)?;
    let rgba = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => rgb_to_rgba(&samples),
        jpeg_decoder::PixelFormat::L8 => gray_to_rgba(&samples),
        jpeg_decoder::PixelFormat::L16 => l16_to_rgba(&samples),
        jpeg_decoder::PixelFormat::CMYK32 => cmyk_to_rgba(&samples),
    };
    PixelBuffer::new(info.width as u32, info.height as u32, rgba).map_err(malformed)
}

#[cfg(not(feature = "jpeg"))]
fn decode_jpeg(
    _decoder: &StandardDecoder,
    _bytes: &[u8],
    _timeout: Option<&TimeoutChecker>,
) -> Result<PixelBuffer, DecodeError> {
    Err(DecodeError::Unavailable("jpeg decoder not compiled in".to_string()))
}

fn rgb_to_rgba(samples: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(samples.len() / 3 * 4);
    for px in samples.chunks_exact(3) {
        rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
    }
    rgba
}

fn gray_to_rgba(samples: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(samples.len() * 4);
    for &v in samples {
        rgba.extend_from_slice(&[v, v, v, 255]);
    }
    rgba
}

fn gray_alpha_to_rgba(samples: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(samples.len() * 2);
    for px in samples.chunks_exact(2) {
        rgba.extend_from_slice(&[px[0], px[0], px[0], px[1]]);
    }
    rgba
}

/// 16-bit luminance arrives big-endian; keep the high byte.
#[cfg(feature = "jpeg")]
fn l16_to_rgba(samples: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(samples.len() * 2);
    for px in samples.chunks_exact(2) {
        rgba.extend_from_slice(&[px[0], px[0], px[0], 255]);
    }
    rgba
}

#[cfg(feature = "jpeg")]
fn cmyk_to_rgba(samples: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(samples.len());
    for px in samples.chunks_exact(4) {
        let c = px[0] as f64 / 255.0;
        let m = px[1] as f64 / 255.0;
        let y = px[2] as f64 / 255.0;
        let k = px[3] as f64 / 255.0;
        let r = ((1.0 - c) * (1.0 - k) * 255.0).clamp(0.0, 255.0) as u8;
        let g = ((1.0 - m) * (1.0 - k) * 255.0).clamp(0.0, 255.0) as u8;
        let b = ((1.0 - y) * (1.0 - k) * 255.0).clamp(0.0, 255.0) as u8;
        rgba.extend_from_slice(&[r, g, b, 255]);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "png")]
    fn encode_png(width: u32, height: u32, rgb: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, width, height);
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().expect("header");
            writer.write_image_data(rgb).expect("image data");
        }
        out
    }

    #[cfg(feature = "png")]
    #[test]
    fn png_decodes_to_rgba() {
        let rgb: Vec<u8> = (0..4 * 4).flat_map(|i| [i as u8, 0x40, 0x80]).collect();
        let bytes = encode_png(4, 4, &rgb);
        let decoder = StandardDecoder::default();
        let pixels = decoder.decode(&bytes).expect("decode");
        assert_eq!(pixels.width(), 4);
        assert_eq!(pixels.height(), 4);
        assert_eq!(pixels.pixel_count(), 16);
        assert_eq!(pixels.channel(0, 1), Some(0x40));
        assert_eq!(pixels.channel(0, 3), Some(255));
    }

    #[cfg(feature = "png")]
    #[test]
    fn truncated_png_is_malformed() {
        let rgb = vec![0u8; 4 * 4 * 3];
        let mut bytes = encode_png(4, 4, &rgb);
        bytes.truncate(bytes.len() / 2);
        let decoder = StandardDecoder::default();
        assert!(matches!(decoder.decode(&bytes), Err(DecodeError::Malformed(_))));
    }

    #[cfg(feature = "png")]
    #[test]
    fn pixel_limit_rejects_before_decoding() {
        let rgb = vec![0u8; 64 * 64 * 3];
        let bytes = encode_png(64, 64, &rgb);
        let decoder = StandardDecoder::new(DecodeLimits {
            max_pixels: 1024,
            ..DecodeLimits::default()
        });
        assert!(matches!(
            decoder.decode(&bytes),
            Err(DecodeError::TooLarge { what: "pixels", .. })
        ));
    }

    #[test]
    fn input_byte_cap_applies_first() {
        let decoder = StandardDecoder::new(DecodeLimits {
            max_input_bytes: 8,
            ..DecodeLimits::default()
        });
        let bytes = vec![0u8; 64];
        assert!(matches!(
            decoder.decode(&bytes),
            Err(DecodeError::TooLarge { what: "bytes", .. })
        ));
    }

    #[test]
    fn unknown_magic_is_unavailable() {
        let decoder = StandardDecoder::default();
        assert!(matches!(
            decoder.decode(b"certainly not an image"),
            Err(DecodeError::Unavailable(_))
        ));
    }

    #[test]
    fn formats_without_codec_are_unavailable() {
        let decoder = StandardDecoder::default();
        let gif = b"GIF89a\x01\x00\x01\x00";
        assert!(matches!(decoder.decode(gif), Err(DecodeError::Unavailable(_))));
        let bmp = b"BM\x00\x00\x00\x00";
        assert!(matches!(decoder.decode(bmp), Err(DecodeError::Unavailable(_))));
    }

    #[test]
    fn conversion_helpers_pad_alpha() {
        assert_eq!(rgb_to_rgba(&[1, 2, 3]), vec![1, 2, 3, 255]);
        assert_eq!(gray_to_rgba(&[9]), vec![9, 9, 9, 255]);
        assert_eq!(gray_alpha_to_rgba(&[7, 128]), vec![7, 7, 7, 128]);
    }

    #[cfg(feature = "jpeg")]
    #[test]
    fn cmyk_zero_ink_is_white() {
        assert_eq!(cmyk_to_rgba(&[0, 0, 0, 0]), vec![255, 255, 255, 255]);
        assert_eq!(cmyk_to_rgba(&[0, 0, 0, 255]), vec![0, 0, 0, 255]);
    }
}
