//! Shared synthetic fixtures for the integration suites. Everything is
//! generated in code; the filler alphabet stays clear of every byte that
//! starts a known payload magic.

/// Filler drawn from 31 printable symbols in `0x60..=0x7e`.
pub fn filler(len: usize) -> Vec<u8> {
    (0..len).map(|i| 0x60 + ((i * 7 + 13) % 31) as u8).collect()
}

/// A PNG byte stream with magic, IHDR, one IDAT holding `body` and the
/// canonical IEND terminator. Chunk CRCs for IHDR and IDAT are zeroed;
/// nothing on the byte-level path reads them.
pub fn synthetic_png(body: &[u8]) -> Vec<u8> {
    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    png.extend_from_slice(&13u32.to_be_bytes());
    png.extend_from_slice(b"IHDR");
    png.extend_from_slice(&64u32.to_be_bytes());
    png.extend_from_slice(&64u32.to_be_bytes());
    png.extend_from_slice(&[8, 2, 0, 0, 0]);
    png.extend_from_slice(&[0; 4]);
    png.extend_from_slice(&(body.len() as u32).to_be_bytes());
    png.extend_from_slice(b"IDAT");
    png.extend_from_slice(body);
    png.extend_from_slice(&[0; 4]);
    png.extend_from_slice(b"\x00\x00\x00\x00IEND\xae\x42\x60\x82");
    png
}

/// Offset of the IDAT payload inside [`synthetic_png`] output.
pub fn idat_body_offset() -> usize {
    // magic + IHDR chunk + IDAT length and type.
    8 + 25 + 8
}

/// A ZIP local file header (deflate, version 20, one stored name) padded
/// with filler to `total_len` bytes.
pub fn zip_payload(total_len: usize) -> Vec<u8> {
    let mut zip = vec![0u8; 30];
    zip[0..4].copy_from_slice(b"PK\x03\x04");
    zip[4..6].copy_from_slice(&20u16.to_le_bytes());
    zip[8..10].copy_from_slice(&8u16.to_le_bytes());
    zip[26..28].copy_from_slice(&11u16.to_le_bytes());
    zip.extend_from_slice(b"payload.bin");
    let body = total_len.saturating_sub(zip.len());
    zip.extend(filler(body));
    zip
}
