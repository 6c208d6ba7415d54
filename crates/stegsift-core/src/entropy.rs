/// Computes the normalized Shannon entropy of a byte slice.
///
/// Returns a value in the range [0.0, 1.0] (bits per byte divided by 8),
/// where 0.0 indicates all bytes are identical and 1.0 indicates a
/// perfectly uniform distribution across all 256 byte values. An empty
/// slice yields 0.0.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq = [0usize; 256];
    for &b in data {
        freq[b as usize] += 1;
    }
    let len = data.len() as f64;
    let mut bits = 0.0;
    for &c in freq.iter() {
        if c == 0 {
            continue;
        }
        let p = c as f64 / len;
        bits -= p * p.log2();
    }
    bits / 8.0
}
