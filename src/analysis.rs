//! Forward transform, magnitude spectrum, and peak-bin extraction.

// SPDX-License-Identifier: Apache-2.0

use defmt::Format;
use libm::sqrtf;
use microfft::real::rfft_128;

/// Number of samples collected per analysis cycle. Must match the
/// [`rfft_128`] entry point below.
pub const BLOCK_SIZE: usize = 128;

/// Number of informative bins: the spectrum of a real signal is
/// conjugate-symmetric, so only the first half carries information.
pub const SPECTRUM_BINS: usize = BLOCK_SIZE / 2;

/// The non-DC bin with the largest magnitude in one analysis pass.
///
/// Recomputed every cycle; convert `bin` to Hz with
/// [`FrequencyMapper::frequency_for_bin`](crate::freq::FrequencyMapper::frequency_for_bin).
#[derive(Debug, PartialEq, Clone, Copy, Format)]
pub struct PeakResult {
    /// Index of the winning bin, in `1..SPECTRUM_BINS`.
    pub bin: usize,
    /// Magnitude of the winning bin.
    pub magnitude: f32,
}

/// Runs the real FFT over a full sample block and finds the peak bin.
///
/// Owns its scratch storage, so a single instance can live in `main` and be
/// reused every cycle without allocation. Logically pure: `analyze` depends
/// only on its input block, and repeated calls on identical input return
/// identical results.
pub struct SpectralAnalyzer {
    /// In-place FFT workspace; the input block is copied here so callers
    /// keep an untouched view of their samples.
    scratch: [f32; BLOCK_SIZE],
    /// Magnitude of each informative bin from the most recent pass.
    magnitudes: [f32; SPECTRUM_BINS],
}

impl SpectralAnalyzer {
    /// Create an analyzer with zeroed scratch storage.
    pub const fn new() -> Self {
        Self {
            scratch: [0.0; BLOCK_SIZE],
            magnitudes: [0.0; SPECTRUM_BINS],
        }
    }

    /// Transform one full block and return the peak bin and its magnitude.
    ///
    /// The DC bin is forced to zero before the peak search: it reflects
    /// signal bias, not a periodic component, and must never win. Ties
    /// resolve to the lowest bin index.
    pub fn analyze(&mut self, samples: &[f32; BLOCK_SIZE]) -> PeakResult {
        self.scratch.copy_from_slice(samples);
        let spectrum = rfft_128(&mut self.scratch);

        // The real-valued coefficient at the Nyquist frequency is packed
        // into the imaginary part of the DC bin; clear it before computing
        // magnitudes.
        spectrum[0].im = 0.0;

        for (magnitude, bin) in self.magnitudes.iter_mut().zip(spectrum.iter()) {
            *magnitude = sqrtf(bin.norm_sqr());
        }
        self.magnitudes[0] = 0.0;

        let mut peak = PeakResult {
            bin: 1,
            magnitude: self.magnitudes[1],
        };
        for (bin, &magnitude) in self.magnitudes.iter().enumerate().skip(2) {
            if magnitude > peak.magnitude {
                peak = PeakResult { bin, magnitude };
            }
        }
        peak
    }

    /// Magnitude spectrum from the most recent [`analyze`](Self::analyze) pass.
    pub fn magnitudes(&self) -> &[f32; SPECTRUM_BINS] {
        &self.magnitudes
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
