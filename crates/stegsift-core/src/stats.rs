//! LSB-plane statistics. Both tests work on a bounded pixel sample and
//! flag distributions that plain photographic noise would not produce.

use crate::model::{ChiSquareResult, SamplePairsResult, StatisticalReport};
use crate::pixels::PixelBuffer;

/// Below this approximate p-value the LSB plane is considered shaped.
const P_SUSPICIOUS: f64 = 0.05;

/// Acceptable band for the sample-pairs equal-LSB ratio.
const RATIO_LOW: f64 = 0.4;
const RATIO_HIGH: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct StatsOptions {
    /// Pixels sampled from the start of the buffer.
    pub max_sample_pixels: usize,
    /// Neighbors within this value distance count as a close pair.
    pub closeness: u8,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self { max_sample_pixels: 1 << 18, closeness: 2 }
    }
}

pub fn run_statistics(pixels: &PixelBuffer, options: &StatsOptions) -> StatisticalReport {
    StatisticalReport {
        chi_square: chi_square_test(pixels, options),
        sample_pairs: sample_pairs_test(pixels, options),
    }
}

/// Goodness of fit of per-channel LSB counts against the 50/50 split an
/// untouched noise floor sits near. The statistic sums R, G and B. The
/// p-value uses the exp(-x/2) tail shortcut, which is exact only for two
/// degrees of freedom; it is monotonic in the statistic, which is all the
/// suspicion gate needs.
pub fn chi_square_test(pixels: &PixelBuffer, options: &StatsOptions) -> ChiSquareResult {
    let rgba = pixels.rgba();
    let sample = pixels.pixel_count().min(options.max_sample_pixels);
    let mut statistic = 0.0;
    for channel in 0..3 {
        let mut ones = 0usize;
        for i in 0..sample {
            ones += (rgba[i * 4 + channel] & 1) as usize;
        }
        let n = sample as f64;
        let expected = n / 2.0;
        if expected > 0.0 {
            let ones = ones as f64;
            let zeros = n - ones;
            statistic += (ones - expected).powi(2) / expected
                + (zeros - expected).powi(2) / expected;
        }
    }
    let p_value = (-statistic / 2.0).exp();
    ChiSquareResult { statistic, p_value, suspicious: p_value < P_SUSPICIOUS }
}

/// Equal-LSB ratio among close-valued horizontal neighbors. LSB replacement
/// decouples the low bit from the sample value, dragging the ratio toward
/// one half; photographic content keeps it off-center. No close pairs at
/// all reports the neutral ratio and stays quiet.
pub fn sample_pairs_test(pixels: &PixelBuffer, options: &StatsOptions) -> SamplePairsResult {
    let rgba = pixels.rgba();
    let sample = pixels.pixel_count().min(options.max_sample_pixels);
    let mut close = 0usize;
    let mut same_lsb = 0usize;
    for channel in 0..3 {
        for i in 0..sample.saturating_sub(1) {
            let a = rgba[i * 4 + channel];
            let b = rgba[(i + 1) * 4 + channel];
            if a.abs_diff(b) <= options.closeness {
                close += 1;
                if a & 1 == b & 1 {
                    same_lsb += 1;
                }
            }
        }
    }
    if close == 0 {
        return SamplePairsResult { ratio: 0.5, suspicious: false };
    }
    let ratio = same_lsb as f64 / close as f64;
    SamplePairsResult { ratio, suspicious: !(RATIO_LOW..=RATIO_HIGH).contains(&ratio) }
}
