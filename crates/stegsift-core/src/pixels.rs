use std::fmt;

/// Maximum accepted pixel buffer size (16 megapixels * 4 = 64 MB).
pub const MAX_PIXEL_BUFFER_BYTES: u64 = 64 * 1024 * 1024;

/// Decoded image pixels as handed over by a codec collaborator.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    /// RGBA samples, row-major, 4 bytes per pixel.
    rgba: Vec<u8>,
}

/// Errors while constructing a pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBufferError {
    /// Width or height is zero.
    ZeroDimension(&'static str),
    /// Calculated buffer size exceeds the safety limit.
    BufferSizeExceeded { expected: u64, limit: u64 },
    /// Provided sample vector does not match width * height * 4.
    SizeMismatch { expected: usize, actual: usize },
    /// Arithmetic overflow in buffer size calculations.
    ArithmeticOverflow(&'static str),
}

impl fmt::Display for PixelBufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDimension(which) => write!(f, "zero {}", which),
            Self::BufferSizeExceeded { expected, limit } => {
                write!(f, "buffer {} bytes exceeds limit {} bytes", expected, limit)
            }
            Self::SizeMismatch { expected, actual } => {
                write!(f, "need {} bytes, got {}", expected, actual)
            }
            Self::ArithmeticOverflow(what) => write!(f, "arithmetic overflow: {}", what),
        }
    }
}

impl std::error::Error for PixelBufferError {}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, PixelBufferError> {
        if width == 0 {
            return Err(PixelBufferError::ZeroDimension("width"));
        }
        if height == 0 {
            return Err(PixelBufferError::ZeroDimension("height"));
        }
        let expected = (width as u64)
            .checked_mul(height as u64)
            .and_then(|v| v.checked_mul(4))
            .ok_or(PixelBufferError::ArithmeticOverflow("rgba_size"))?;
        if expected > MAX_PIXEL_BUFFER_BYTES {
            return Err(PixelBufferError::BufferSizeExceeded {
                expected,
                limit: MAX_PIXEL_BUFFER_BYTES,
            });
        }
        let expected = expected as usize;
        if rgba.len() != expected {
            return Err(PixelBufferError::SizeMismatch { expected, actual: rgba.len() });
        }
        Ok(Self { width, height, rgba })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Channel sample for pixel `index`, channel 0..=3 (R, G, B, A).
    pub fn channel(&self, index: usize, channel: usize) -> Option<u8> {
        self.rgba.get(index.checked_mul(4)?.checked_add(channel)?).copied()
    }
}

/// Errors reported by a codec collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// No decoder is available for the input (unknown magic, or the format's
    /// feature was compiled out).
    Unavailable(String),
    /// The input claims a known format but does not decode.
    Malformed(String),
    /// Declared size exceeds a configured limit; `what` names the unit.
    TooLarge { what: &'static str, actual: u64, limit: u64 },
    /// Decoding exceeded its wall-clock budget.
    Timeout { budget_ms: u64 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "decoder unavailable: {}", reason),
            Self::Malformed(reason) => write!(f, "malformed image: {}", reason),
            Self::TooLarge { what, actual, limit } => {
                write!(f, "{} {} exceeds limit {}", actual, what, limit)
            }
            Self::Timeout { budget_ms } => write!(f, "decode timed out after {} ms", budget_ms),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Codec capability. The engine never decodes images itself; pixel data
/// arrives through this seam and the byte-level stages run regardless of
/// whether a decoder is present.
pub trait PixelDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_buffer() {
        let buf = PixelBuffer::new(2, 2, vec![0u8; 16]).expect("should succeed");
        assert_eq!(buf.pixel_count(), 4);
        assert_eq!(buf.channel(3, 3), Some(0));
        assert_eq!(buf.channel(4, 0), None);
    }

    #[test]
    fn zero_width_rejected() {
        let result = PixelBuffer::new(0, 10, Vec::new());
        assert!(matches!(result, Err(PixelBufferError::ZeroDimension("width"))));
    }

    #[test]
    fn zero_height_rejected() {
        let result = PixelBuffer::new(10, 0, Vec::new());
        assert!(matches!(result, Err(PixelBufferError::ZeroDimension("height"))));
    }

    #[test]
    fn size_mismatch_rejected() {
        let result = PixelBuffer::new(2, 2, vec![0u8; 12]);
        assert!(matches!(
            result,
            Err(PixelBufferError::SizeMismatch { expected: 16, actual: 12 })
        ));
    }

    #[test]
    fn oversized_buffer_rejected() {
        let result = PixelBuffer::new(100_000, 100_000, vec![0u8; 4]);
        assert!(matches!(result, Err(PixelBufferError::BufferSizeExceeded { .. })));
    }
}
