//! LSB payload extraction. Four common embedding layouts are attempted and
//! whatever decodes to plausible text is reported as a candidate; nothing
//! here is a verdict on its own.

use crate::model::{LsbCandidate, LsbReport};
use crate::pixels::PixelBuffer;

/// Embedding layouts tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsbMethod {
    /// One bit per channel, R, G, B per pixel.
    Standard,
    /// Two bits per channel, high bit first.
    TwoBit,
    /// Red channel only.
    RedChannel,
    /// One bit per pixel, rotating through R, G, B.
    Sequential,
}

impl LsbMethod {
    pub const ALL: [LsbMethod; 4] =
        [Self::Standard, Self::TwoBit, Self::RedChannel, Self::Sequential];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::TwoBit => "two-bit",
            Self::RedChannel => "red-channel",
            Self::Sequential => "sequential",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LsbOptions {
    /// Decoded payload cap per method.
    pub max_payload_bytes: usize,
    /// Shortest printable run accepted as a terminated message.
    pub min_text_run: usize,
    /// Preview truncation.
    pub preview_chars: usize,
}

impl Default for LsbOptions {
    fn default() -> Self {
        Self { max_payload_bytes: 4096, min_text_run: 10, preview_chars: 64 }
    }
}

pub struct LsbExtractor {
    options: LsbOptions,
}

impl LsbExtractor {
    pub fn new(options: LsbOptions) -> Self {
        Self { options }
    }

    /// Run every method against the pixels and collect text candidates.
    /// Methods that produced a null-terminated run are listed as suspected
    /// embedding methods.
    pub fn extract(&self, pixels: &PixelBuffer) -> LsbReport {
        let mut report = LsbReport::default();
        for method in LsbMethod::ALL {
            let decoded = self.decode(pixels, method);
            if let Some(candidate) = self.recover_text(method, &decoded) {
                if candidate.terminated {
                    report.suspected_methods.push(method.as_str().to_string());
                }
                report.candidates.push(candidate);
            }
        }
        report
    }

    /// Bit-plane payload for one method, MSB-first packing, capped.
    pub fn decode(&self, pixels: &PixelBuffer, method: LsbMethod) -> Vec<u8> {
        pack(bit_stream(pixels.rgba(), method), self.options.max_payload_bytes)
    }

    fn recover_text(&self, method: LsbMethod, decoded: &[u8]) -> Option<LsbCandidate> {
        let mut run_start: Option<usize> = None;
        for (i, &byte) in decoded.iter().enumerate() {
            if is_printable(byte) {
                run_start.get_or_insert(i);
                continue;
            }
            if byte == 0 {
                if let Some(start) = run_start {
                    let run = &decoded[start..i];
                    if run.len() >= self.options.min_text_run {
                        return Some(self.candidate(method, run, true));
                    }
                }
            }
            run_start = None;
        }
        if !decoded.is_empty() && decoded.iter().copied().all(is_printable) {
            return Some(self.candidate(method, decoded, false));
        }
        None
    }

    fn candidate(&self, method: LsbMethod, run: &[u8], terminated: bool) -> LsbCandidate {
        let preview_len = run.len().min(self.options.preview_chars);
        LsbCandidate {
            method: method.as_str().to_string(),
            preview: String::from_utf8_lossy(&run[..preview_len]).into_owned(),
            length: run.len(),
            terminated,
        }
    }
}

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7e).contains(&byte)
}

fn bit_stream<'a>(rgba: &'a [u8], method: LsbMethod) -> Box<dyn Iterator<Item = u8> + 'a> {
    let pixels = rgba.chunks_exact(4);
    match method {
        LsbMethod::Standard => {
            Box::new(pixels.flat_map(|px| [px[0] & 1, px[1] & 1, px[2] & 1]))
        }
        LsbMethod::TwoBit => Box::new(pixels.flat_map(|px| {
            [
                (px[0] >> 1) & 1,
                px[0] & 1,
                (px[1] >> 1) & 1,
                px[1] & 1,
                (px[2] >> 1) & 1,
                px[2] & 1,
            ]
        })),
        LsbMethod::RedChannel => Box::new(pixels.map(|px| px[0] & 1)),
        LsbMethod::Sequential => {
            Box::new(pixels.enumerate().map(|(i, px)| px[i % 3] & 1))
        }
    }
}

fn pack(bits: impl Iterator<Item = u8>, cap: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut acc = 0u8;
    let mut filled = 0u8;
    for bit in bits {
        acc = (acc << 1) | bit;
        filled += 1;
        if filled == 8 {
            out.push(acc);
            if out.len() >= cap {
                break;
            }
            acc = 0;
            filled = 0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pixels with `message` in the standard layout, remaining bits zero.
    fn embed_standard(message: &[u8], pixel_count: usize) -> PixelBuffer {
        let mut bits = Vec::new();
        for &byte in message {
            for k in (0..8).rev() {
                bits.push((byte >> k) & 1);
            }
        }
        let mut rgba = Vec::with_capacity(pixel_count * 4);
        let mut cursor = 0usize;
        for _ in 0..pixel_count {
            for _ in 0..3 {
                let bit = bits.get(cursor).copied().unwrap_or(0);
                cursor += 1;
                rgba.push(0x80 | bit);
            }
            rgba.push(0xff);
        }
        PixelBuffer::new(pixel_count as u32, 1, rgba).expect("fixture buffer")
    }

    #[test]
    fn standard_embedding_recovers_terminated_message() {
        let message = b"meet at the old pier at dawn";
        let pixels = embed_standard(message, 400);
        let extractor = LsbExtractor::new(LsbOptions::default());
        let report = extractor.extract(&pixels);

        let hit = report
            .candidates
            .iter()
            .find(|c| c.method == "standard")
            .expect("standard candidate");
        assert!(hit.terminated);
        assert_eq!(hit.length, message.len());
        assert_eq!(hit.preview.as_bytes(), &message[..]);
        assert!(report.suspected_methods.contains(&"standard".to_string()));
    }

    #[test]
    fn flat_pixels_yield_no_candidates() {
        let rgba: Vec<u8> = (0..400).flat_map(|_| [0x80u8, 0x80, 0x80, 0xff]).collect();
        let pixels = PixelBuffer::new(400, 1, rgba).expect("fixture buffer");
        let extractor = LsbExtractor::new(LsbOptions::default());
        let report = extractor.extract(&pixels);
        assert!(report.candidates.is_empty());
        assert!(report.suspected_methods.is_empty());
    }

    #[test]
    fn saturated_low_bits_are_not_text() {
        // Both low bits set in every channel decodes to 0xff in every layout.
        let rgba: Vec<u8> = (0..400).flat_map(|_| [0x83u8, 0x83, 0x83, 0xff]).collect();
        let pixels = PixelBuffer::new(400, 1, rgba).expect("fixture buffer");
        let extractor = LsbExtractor::new(LsbOptions::default());
        assert!(extractor.extract(&pixels).candidates.is_empty());
    }

    #[test]
    fn printable_payload_without_terminator_is_loose() {
        // Every LSB carries bits of 'A'; the decoded stream is printable to
        // the end of the buffer with no null in sight.
        let mut rgba = Vec::new();
        let bits: Vec<u8> = (0..8).map(|k| (b'A' >> (7 - k)) & 1).collect();
        let mut cursor = 0usize;
        for _ in 0..160 {
            for _ in 0..3 {
                rgba.push(0x80 | bits[cursor % 8]);
                cursor += 1;
            }
            rgba.push(0xff);
        }
        let pixels = PixelBuffer::new(160, 1, rgba).expect("fixture buffer");
        let extractor = LsbExtractor::new(LsbOptions::default());
        let report = extractor.extract(&pixels);

        let hit = report
            .candidates
            .iter()
            .find(|c| c.method == "standard")
            .expect("standard candidate");
        assert!(!hit.terminated);
        assert_eq!(hit.length, 160 * 3 / 8);
        assert!(hit.preview.chars().all(|c| c == 'A'));
        assert!(!report.suspected_methods.contains(&"standard".to_string()));
    }

    #[test]
    fn sequential_layout_round_trips() {
        let message = b"sequential channel walk";
        let mut bits = Vec::new();
        for &byte in message {
            for k in (0..8).rev() {
                bits.push((byte >> k) & 1);
            }
        }
        let pixel_count = 400usize;
        let mut rgba = vec![0u8; pixel_count * 4];
        for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
            px[0] = 0x40;
            px[1] = 0x40;
            px[2] = 0x40;
            px[3] = 0xff;
            let bit = bits.get(i).copied().unwrap_or(0);
            px[i % 3] |= bit;
        }
        let pixels = PixelBuffer::new(pixel_count as u32, 1, rgba).expect("fixture buffer");
        let extractor = LsbExtractor::new(LsbOptions::default());
        let decoded = extractor.decode(&pixels, LsbMethod::Sequential);
        assert_eq!(&decoded[..message.len()], message);

        let report = extractor.extract(&pixels);
        assert!(report.suspected_methods.contains(&"sequential".to_string()));
    }

    #[test]
    fn decode_respects_payload_cap() {
        let rgba: Vec<u8> = (0..1000).flat_map(|_| [0x81u8, 0x80, 0x81, 0xff]).collect();
        let extractor = LsbExtractor::new(LsbOptions {
            max_payload_bytes: 16,
            ..LsbOptions::default()
        });
        let pixels = PixelBuffer::new(1000, 1, rgba).expect("fixture buffer");
        assert_eq!(extractor.decode(&pixels, LsbMethod::Standard).len(), 16);
    }

    #[test]
    fn short_printable_run_before_null_is_ignored() {
        // "hi" then a null is far below the minimum run.
        let mut message = b"hi".to_vec();
        message.push(0);
        message.extend_from_slice(&[0x01, 0x02, 0x03, 0x9f, 0xff]);
        let pixels = embed_standard(&message, 400);
        let extractor = LsbExtractor::new(LsbOptions::default());
        let report = extractor.extract(&pixels);
        assert!(report.candidates.iter().all(|c| c.method != "standard"));
    }
}
