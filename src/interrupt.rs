//! Static [`Mutex`] shared between the interrupt handler and the run loop.

use core::cell::RefCell;
use critical_section::Mutex;

use crate::components::AdcSampleTrigger;
use crate::control::AcquisitionController;

/// The single acquisition controller, for access from `ADC_IRQ_FIFO`.
///
/// Installed once by `main` before the interrupt is unmasked; every access
/// afterwards goes through a [`critical_section`], so the interrupt and the
/// run loop never observe the controller mid-transition.
pub static CONTROLLER: Mutex<RefCell<Option<AcquisitionController<AdcSampleTrigger>>>> =
    Mutex::new(RefCell::new(None));
