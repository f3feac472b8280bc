//! Conversions between frequencies in Hz and spectrum bin indices.

/// Pure mapping between a frequency in Hz and the nearest spectral bin,
/// fixed by the sampling rate and block size.
///
/// Both parameters are compile-time constants in practice, so construction
/// has no failure modes worth modelling.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyMapper {
    /// Sampling rate in Hz.
    sample_rate_hz: u32,
    /// Number of samples per analysis block.
    block_size: usize,
}

impl FrequencyMapper {
    /// Create a mapper for the given sampling rate and block size.
    pub const fn new(sample_rate_hz: u32, block_size: usize) -> Self {
        Self {
            sample_rate_hz,
            block_size,
        }
    }

    /// Width of one frequency bin in Hz.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate_hz as f32 / self.block_size as f32
    }

    /// Index of the bin whose acceptance window contains `freq_hz`.
    ///
    /// Windows are centered on `k * bin_width`, so a frequency exactly
    /// halfway between two bins maps to the higher one (round half up).
    pub fn bin_for_frequency(&self, freq_hz: f32) -> usize {
        let width = self.bin_width();
        ((freq_hz + width / 2.0) / width) as usize
    }

    /// Center frequency of bin `k`, in whole Hz.
    ///
    /// Integer division, matching the granularity used when reporting the
    /// peak frequency.
    pub fn frequency_for_bin(&self, bin: usize) -> u32 {
        (bin as u32).wrapping_mul(self.sample_rate_hz) / self.block_size as u32
    }
}
