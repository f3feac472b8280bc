//! Fixed-capacity sample block, written one reading at a time from the
//! acquisition interrupt and consumed wholesale by the analyzer.

// SPDX-License-Identifier: Apache-2.0

use defmt::Format;

/// `append` was called on a buffer whose cursor already reached capacity.
///
/// The acquisition trigger is supposed to be disabled before the block is
/// handed to the analyzer, so hitting this means the sequencing invariant
/// broke. [`AcquisitionController`](crate::control::AcquisitionController)
/// treats it as fatal to the current cycle.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Format)]
pub struct BufferFull;

/// Ordered store of exactly `N` sample slots plus a write cursor.
///
/// The cursor lives in `[0, N]`; it is advanced only by [`append`] (called
/// from the sample-ready interrupt) and rewound only by [`reset`] (called by
/// the controller after the trigger has been disabled). There is no
/// double-buffering: contents are overwritten every cycle.
///
/// [`append`]: SampleBuffer::append
/// [`reset`]: SampleBuffer::reset
pub struct SampleBuffer<const N: usize> {
    /// Sample storage, valid up to `cursor`.
    samples: [f32; N],
    /// Next free slot.
    cursor: usize,
}

impl<const N: usize> SampleBuffer<N> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self {
            samples: [0.0; N],
            cursor: 0,
        }
    }

    /// Store `value` at the cursor and advance it by one.
    ///
    /// Constant-time, no blocking: safe to call from interrupt context. Only
    /// the designated acquisition callback may call this.
    pub fn append(&mut self, value: f32) -> Result<(), BufferFull> {
        if self.cursor == N {
            return Err(BufferFull);
        }
        self.samples[self.cursor] = value;
        self.cursor += 1;
        Ok(())
    }

    /// True iff the cursor reached capacity.
    pub fn is_full(&self) -> bool {
        self.cursor == N
    }

    /// Number of samples collected so far.
    pub fn len(&self) -> usize {
        self.cursor
    }

    /// True iff no samples have been collected.
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Rewind the cursor to 0.
    ///
    /// Must only be called while no acquisition is in flight, i.e. after the
    /// sampling trigger has been disabled.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// View of the samples collected so far. A partial view is incomplete
    /// data and must not be analyzed; use [`as_full_block`](Self::as_full_block)
    /// for the analysis path.
    pub fn as_slice(&self) -> &[f32] {
        &self.samples[..self.cursor]
    }

    /// The complete block, or `None` while the buffer is still filling.
    pub fn as_full_block(&self) -> Option<&[f32; N]> {
        self.is_full().then_some(&self.samples)
    }
}
