//! This [RP2040](rp2040_hal) firmware captures fixed blocks of analog
//! samples at a known rate, runs a real FFT over each block, and reports the
//! dominant frequency bin over defmt/RTT, repeating forever with a cooldown
//! between cycles.
//!
//! The pipeline is split between two execution contexts. `ADC_IRQ_FIFO`
//! appends one sample per conversion through
//! [`AcquisitionController::service_trigger`](control::AcquisitionController::service_trigger);
//! when the block fills, the trigger is disabled and the run loop in the
//! binary performs the transform, reporting, and cooldown before re-arming.
//! Sampling stays disabled for that whole stretch, so the single shared
//! buffer is never written while it is being read.
//!
//! ## Crate features
//!
//! - `report_targets`: Reports the magnitude measured at each configured
//!   target frequency every cycle, alongside the peak. Enabled by default.
//! - `trace_spectrum`: Logs the full magnitude spectrum every cycle. Very
//!   noisy!
//!
//! ## Demo
//!
//! The deferred-analysis half of the cycle, as driven by the binary crate:
//!
//! ```ignore
//! loop {
//!     cortex_m::asm::wfi();
//!
//!     let Some(block) = critical_section::with(|cs| {
//!         let mut slot = CONTROLLER.borrow_ref_mut(cs);
//!         slot.as_mut().and_then(|c| c.pending_block().copied())
//!     }) else {
//!         continue;
//!     };
//!
//!     let peak = analyzer.analyze(&block);
//!     info!("peak {=u32} Hz", mapper.frequency_for_bin(peak.bin));
//!
//!     critical_section::with(|cs| {
//!         let mut slot = CONTROLLER.borrow_ref_mut(cs);
//!         if let Some(c) = slot.as_mut() {
//!             c.finish_analysis(peak);
//!         }
//!     });
//!     timer.delay_ms(COOLDOWN_MS);
//!     critical_section::with(|cs| {
//!         let mut slot = CONTROLLER.borrow_ref_mut(cs);
//!         if let Some(c) = slot.as_mut() {
//!             c.rearm();
//!         }
//!     });
//! }
//! ```

// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub mod analysis;
pub mod buffer;
pub mod components;
pub mod control;
pub mod freq;
pub mod interrupt;
