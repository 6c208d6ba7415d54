//! Cheap structural plausibility checks for signature matches. A magic
//! number alone is two to eight bytes of evidence; these checks peek at the
//! header fields that would have to follow a real payload.

use crate::signatures::Signature;

/// Structural plausibility of the payload claimed by `signature` at
/// `offset`, in `[0, 1]`. Formats without a validator score a neutral 0.5.
pub fn structural_score(bytes: &[u8], signature: &Signature, offset: usize) -> f64 {
    match signature.name {
        "mz" => score_mz(bytes, offset),
        "zip" => score_zip(bytes, offset),
        "pdf" => score_pdf(bytes, offset),
        _ => 0.5,
    }
}

/// DOS header through PE machine field, scored in stages so a truncated or
/// corrupted header still earns partial credit.
fn score_mz(bytes: &[u8], offset: usize) -> f64 {
    let mut score = 0.1;
    let Some(e_lfanew) = read_u32_le(bytes, offset + 60) else {
        return score;
    };
    let e_lfanew = e_lfanew as usize;
    let remaining = bytes.len() - offset;
    if e_lfanew < 64 || e_lfanew >= remaining || e_lfanew >= 0x1000_0000 {
        return score;
    }
    score = 0.3;
    let pe = offset + e_lfanew;
    if bytes.len() < pe + 4 || &bytes[pe..pe + 4] != b"PE\0\0" {
        return score;
    }
    score = 0.5;
    let Some(machine) = read_u16_le(bytes, pe + 4) else {
        return score;
    };
    // x86, x64, ARM, ARMv7, ARM64
    if matches!(machine, 0x014c | 0x8664 | 0x01c0 | 0x01c4 | 0xaa64) {
        0.9
    } else {
        score
    }
}

/// Local file header sanity: plausible version, known compression method,
/// non-empty bounded file name.
fn score_zip(bytes: &[u8], offset: usize) -> f64 {
    let version = read_u16_le(bytes, offset + 4);
    let method = read_u16_le(bytes, offset + 8);
    let name_len = read_u16_le(bytes, offset + 26);
    match (version, method, name_len) {
        (Some(v), Some(m), Some(n))
            if v <= 63 && matches!(m, 0 | 8 | 14) && n > 0 && n <= 1000 =>
        {
            0.8
        }
        _ => 0.0,
    }
}

/// `%PDF-` must be followed by a `digit.digit` version.
fn score_pdf(bytes: &[u8], offset: usize) -> f64 {
    match bytes.get(offset + 5..offset + 8) {
        Some([major, b'.', minor]) if major.is_ascii_digit() && minor.is_ascii_digit() => 0.7,
        _ => 0.0,
    }
}

fn read_u16_le(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

fn read_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
