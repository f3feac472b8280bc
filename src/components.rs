//! Hardware-facing component structs.

use rp2040_hal::adc::AdcFifo;

use crate::control::{AnalogReader, AnalogReadFault, SampleTrigger};

/// RP2040 ADC FIFO acting as both the periodic trigger source and the
/// analog reader.
///
/// The FIFO's pacing divider fires one conversion per sampling period and
/// raises `ADC_IRQ_FIFO` per stored sample, so enable/disable of the
/// trigger maps onto resuming/pausing the FIFO. Built from
/// [`Adc::build_fifo`](rp2040_hal::Adc::build_fifo) with `start_paused`;
/// the controller arms it when the first cycle starts.
pub struct AdcSampleTrigger {
    /// Paced single-channel capture FIFO.
    fifo: AdcFifo<'static, u16>,
}

impl AdcSampleTrigger {
    /// Wrap a paused, interrupt-enabled capture FIFO.
    pub fn new(fifo: AdcFifo<'static, u16>) -> Self {
        Self { fifo }
    }
}

impl SampleTrigger for AdcSampleTrigger {
    fn enable(&mut self) {
        // Stale conversions from before the pause belong to no cycle
        self.fifo.clear();
        self.fifo.resume();
    }

    fn disable(&mut self) {
        self.fifo.pause();
    }
}

impl AnalogReader for AdcSampleTrigger {
    fn read_sample(&mut self) -> Result<u16, AnalogReadFault> {
        // The interrupt fired, so a conversion should be waiting; an empty
        // FIFO means conversion-not-ready and the slot must not be faked.
        if self.fifo.len() == 0 {
            return Err(AnalogReadFault);
        }
        Ok(self.fifo.read())
    }
}
