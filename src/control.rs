//! Acquisition state machine: sequences collect, analyze, cool down, re-arm.

// SPDX-License-Identifier: Apache-2.0

use defmt::Format;

use crate::analysis::{PeakResult, BLOCK_SIZE};
use crate::buffer::SampleBuffer;

/// Hardware pacing source for sample conversions.
///
/// Implemented by the ADC FIFO wrapper in [`components`](crate::components);
/// tests substitute a mock. The controller is the only caller: the trigger
/// is disabled before every analysis pass and re-enabled only after the
/// buffer cursor has been reset, which is the ordering guarantee the whole
/// pipeline rests on.
pub trait SampleTrigger {
    /// Arm the trigger so conversions fire at the sampling rate.
    fn enable(&mut self);
    /// Stop further conversions from firing.
    fn disable(&mut self);
}

/// Yields one raw conversion per trigger event.
pub trait AnalogReader {
    /// Take the conversion for the current trigger event, if one is ready.
    fn read_sample(&mut self) -> Result<u16, AnalogReadFault>;
}

/// The analog reader had no valid conversion for a fired trigger event.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Format)]
pub struct AnalogReadFault;

/// How the controller responds to an [`AnalogReadFault`].
///
/// A faulted slot is never zero-filled; it is either retried on the next
/// trigger event or the whole cycle is abandoned.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Format)]
pub enum FaultPolicy {
    /// Leave the slot for the next trigger event and keep sampling.
    SkipSample,
    /// Abandon the cycle and return to `Idle`.
    AbortCycle,
}

/// Where the controller is in the acquisition cycle.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Format)]
pub enum AcquisitionState {
    /// Not started, or a cycle was aborted. Trigger disarmed.
    Idle,
    /// Trigger armed; the interrupt is filling the buffer.
    Sampling,
    /// Buffer full, trigger disarmed; a block is waiting for the analyzer.
    Analyzing,
    /// Analysis stored; waiting out the reporting-rate throttle.
    Cooldown,
}

/// Reason a cycle was abandoned.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Format)]
pub enum CycleFault {
    /// A sample arrived outside `Sampling` or past a full buffer: the
    /// trigger was not disabled in time, so the ordering invariant broke.
    Overrun,
    /// The analog reader faulted under [`FaultPolicy::AbortCycle`].
    AnalogRead,
}

/// What a call to [`AcquisitionController::on_sample`] did.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Format)]
pub enum CycleEvent {
    /// The buffer just filled; the trigger is disarmed and a block is ready
    /// for the deferred analysis pass.
    BlockReady,
    /// The cycle was abandoned; the controller is back in `Idle`.
    Aborted(CycleFault),
}

/// Owns the sample buffer, the acquisition state, and the trigger.
///
/// Exactly one instance exists, stored in
/// [`interrupt::CONTROLLER`](crate::interrupt::CONTROLLER); the sample-ready
/// interrupt feeds it through [`service_trigger`](Self::service_trigger) and
/// the run loop drives the remaining transitions. Keeping buffer, state, and
/// trigger behind one owner is what makes the no-lock discipline hold: no
/// other code can append, reset, or re-arm.
pub struct AcquisitionController<T> {
    /// Pacing source, armed only while `Sampling`.
    trigger: T,
    /// The single shared sample block.
    buffer: SampleBuffer<BLOCK_SIZE>,
    /// Current position in the cycle.
    state: AcquisitionState,
    /// Response to analog read faults.
    policy: FaultPolicy,
    /// Fault from the most recent abort, until the run loop collects it.
    fault: Option<CycleFault>,
    /// Result of the most recent completed analysis pass.
    last_peak: Option<PeakResult>,
    /// Slots retried under [`FaultPolicy::SkipSample`], over all cycles.
    skipped_samples: u32,
    /// Completed analyze passes since startup.
    completed_cycles: u32,
}

impl<T: SampleTrigger> AcquisitionController<T> {
    /// Create a controller in `Idle` with an empty buffer.
    ///
    /// The caller hands over the trigger in its disarmed state.
    pub fn new(trigger: T, policy: FaultPolicy) -> Self {
        Self {
            trigger,
            buffer: SampleBuffer::new(),
            state: AcquisitionState::Idle,
            policy,
            fault: None,
            last_peak: None,
            skipped_samples: 0,
            completed_cycles: 0,
        }
    }

    /// Begin the first (or a restarted) cycle: clear the cursor, arm the
    /// trigger, enter `Sampling`. No-op outside `Idle`.
    pub fn start(&mut self) {
        if self.state != AcquisitionState::Idle {
            return;
        }
        self.buffer.reset();
        self.trigger.enable();
        self.state = AcquisitionState::Sampling;
    }

    /// Disarm the trigger and return to `Idle` from any state.
    ///
    /// External stop request; the in-flight block is discarded.
    pub fn stop(&mut self) {
        self.trigger.disable();
        self.buffer.reset();
        self.state = AcquisitionState::Idle;
    }

    /// Feed one trigger event's reading. Interrupt context.
    ///
    /// On the Nth sample this disarms the trigger and hands the full block
    /// to the analysis path (`BlockReady`). Any sequencing violation or an
    /// unrecoverable read fault abandons the cycle.
    pub fn on_sample(&mut self, reading: Result<u16, AnalogReadFault>) -> Option<CycleEvent> {
        if self.state != AcquisitionState::Sampling {
            // Trigger fired while the block was in use: the invariant that
            // sampling stays disabled through analysis has been violated.
            return Some(self.abort(CycleFault::Overrun));
        }

        let raw = match reading {
            Ok(raw) => raw,
            Err(AnalogReadFault) => match self.policy {
                FaultPolicy::SkipSample => {
                    self.skipped_samples = self.skipped_samples.saturating_add(1);
                    return None;
                }
                FaultPolicy::AbortCycle => return Some(self.abort(CycleFault::AnalogRead)),
            },
        };

        if self.buffer.append(f32::from(raw)).is_err() {
            return Some(self.abort(CycleFault::Overrun));
        }

        if self.buffer.is_full() {
            // Disable before the analyzer ever sees the block, and keep it
            // disabled until rearm() has reset the cursor.
            self.trigger.disable();
            self.state = AcquisitionState::Analyzing;
            return Some(CycleEvent::BlockReady);
        }
        None
    }

    /// The full block awaiting analysis, if the controller is in `Analyzing`.
    pub fn pending_block(&self) -> Option<&[f32; BLOCK_SIZE]> {
        match self.state {
            AcquisitionState::Analyzing => self.buffer.as_full_block(),
            _ => None,
        }
    }

    /// Record the analysis result and enter `Cooldown`. No-op outside
    /// `Analyzing`.
    pub fn finish_analysis(&mut self, peak: PeakResult) {
        if self.state != AcquisitionState::Analyzing {
            return;
        }
        self.last_peak = Some(peak);
        self.completed_cycles = self.completed_cycles.wrapping_add(1);
        self.state = AcquisitionState::Cooldown;
    }

    /// End the cooldown: clear the cursor, re-arm the trigger, resume
    /// `Sampling`. No-op outside `Cooldown`.
    pub fn rearm(&mut self) {
        if self.state != AcquisitionState::Cooldown {
            return;
        }
        self.buffer.reset();
        self.trigger.enable();
        self.state = AcquisitionState::Sampling;
    }

    /// Abandon the current cycle and record why.
    fn abort(&mut self, fault: CycleFault) -> CycleEvent {
        self.trigger.disable();
        self.buffer.reset();
        self.state = AcquisitionState::Idle;
        self.fault = Some(fault);
        CycleEvent::Aborted(fault)
    }

    /// Collect the fault from an aborted cycle, clearing it.
    ///
    /// Interrupt-context errors cannot unwind, so the run loop polls this
    /// to decide whether to report and restart.
    pub fn take_fault(&mut self) -> Option<CycleFault> {
        self.fault.take()
    }

    /// Current cycle position.
    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    /// Result of the most recent completed cycle, if any.
    pub fn last_peak(&self) -> Option<PeakResult> {
        self.last_peak
    }

    /// Number of completed analysis passes since startup.
    pub fn completed_cycles(&self) -> u32 {
        self.completed_cycles
    }

    /// Number of slots skipped under [`FaultPolicy::SkipSample`].
    pub fn skipped_samples(&self) -> u32 {
        self.skipped_samples
    }
}

impl<T: SampleTrigger + AnalogReader> AcquisitionController<T> {
    /// Interrupt entry point: pull the reading for this trigger event and
    /// feed it through [`on_sample`](Self::on_sample).
    pub fn service_trigger(&mut self) -> Option<CycleEvent> {
        let reading = self.trigger.read_sample();
        self.on_sample(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Trigger/reader double that records arming state and transitions.
    struct MockTrigger {
        enabled: bool,
        enables: u32,
        disables: u32,
        next: Result<u16, AnalogReadFault>,
    }

    impl MockTrigger {
        fn new() -> Self {
            Self {
                enabled: false,
                enables: 0,
                disables: 0,
                next: Ok(512),
            }
        }
    }

    impl SampleTrigger for MockTrigger {
        fn enable(&mut self) {
            self.enabled = true;
            self.enables += 1;
        }

        fn disable(&mut self) {
            self.enabled = false;
            self.disables += 1;
        }
    }

    impl AnalogReader for MockTrigger {
        fn read_sample(&mut self) -> Result<u16, AnalogReadFault> {
            self.next
        }
    }

    fn sampling_controller(policy: FaultPolicy) -> AcquisitionController<MockTrigger> {
        let mut controller = AcquisitionController::new(MockTrigger::new(), policy);
        controller.start();
        controller
    }

    #[test]
    fn full_cycle_returns_to_armed_sampling() {
        let mut controller = sampling_controller(FaultPolicy::AbortCycle);
        assert_eq!(controller.state(), AcquisitionState::Sampling);
        assert!(controller.trigger.enabled);

        for i in 0..BLOCK_SIZE - 1 {
            assert_eq!(controller.on_sample(Ok(i as u16)), None);
        }
        assert_eq!(controller.on_sample(Ok(0)), Some(CycleEvent::BlockReady));
        assert_eq!(controller.state(), AcquisitionState::Analyzing);
        assert!(!controller.trigger.enabled);

        let block = controller.pending_block().expect("block should be ready");
        assert_eq!(block.len(), BLOCK_SIZE);

        let peak = PeakResult {
            bin: 14,
            magnitude: 3200.0,
        };
        controller.finish_analysis(peak);
        assert_eq!(controller.state(), AcquisitionState::Cooldown);
        assert_eq!(controller.last_peak(), Some(peak));
        assert_eq!(controller.completed_cycles(), 1);
        assert!(controller.pending_block().is_none());

        controller.rearm();
        // Functionally identical to the post-start Sampling state
        assert_eq!(controller.state(), AcquisitionState::Sampling);
        assert!(controller.trigger.enabled);
        assert!(controller.buffer.is_empty());
    }

    #[test]
    fn sample_after_block_ready_aborts_as_overrun() {
        let mut controller = sampling_controller(FaultPolicy::AbortCycle);
        for _ in 0..BLOCK_SIZE {
            controller.on_sample(Ok(100));
        }
        assert_eq!(
            controller.on_sample(Ok(100)),
            Some(CycleEvent::Aborted(CycleFault::Overrun))
        );
        assert_eq!(controller.state(), AcquisitionState::Idle);
        assert_eq!(controller.take_fault(), Some(CycleFault::Overrun));
        assert_eq!(controller.take_fault(), None);
        assert!(!controller.trigger.enabled);
    }

    #[test]
    fn read_fault_skips_slot_under_skip_policy() {
        let mut controller = sampling_controller(FaultPolicy::SkipSample);
        assert_eq!(controller.on_sample(Err(AnalogReadFault)), None);
        assert_eq!(controller.state(), AcquisitionState::Sampling);
        assert_eq!(controller.skipped_samples(), 1);
        assert_eq!(controller.buffer.len(), 0);

        // The cycle still completes once enough good samples arrive
        for _ in 0..BLOCK_SIZE - 1 {
            assert_eq!(controller.on_sample(Ok(7)), None);
        }
        assert_eq!(controller.on_sample(Ok(7)), Some(CycleEvent::BlockReady));
    }

    #[test]
    fn read_fault_aborts_under_abort_policy() {
        let mut controller = sampling_controller(FaultPolicy::AbortCycle);
        controller.on_sample(Ok(40));
        assert_eq!(
            controller.on_sample(Err(AnalogReadFault)),
            Some(CycleEvent::Aborted(CycleFault::AnalogRead))
        );
        assert_eq!(controller.state(), AcquisitionState::Idle);
        assert_eq!(controller.take_fault(), Some(CycleFault::AnalogRead));
        // No partially valid buffer survives the abort
        assert!(controller.buffer.is_empty());
    }

    #[test]
    fn restart_after_abort() {
        let mut controller = sampling_controller(FaultPolicy::AbortCycle);
        controller.on_sample(Err(AnalogReadFault));
        assert_eq!(controller.state(), AcquisitionState::Idle);

        controller.take_fault();
        controller.start();
        assert_eq!(controller.state(), AcquisitionState::Sampling);
        assert!(controller.trigger.enabled);
    }

    #[test]
    fn stop_is_honored_from_any_state() {
        let mut controller = sampling_controller(FaultPolicy::AbortCycle);
        for _ in 0..BLOCK_SIZE {
            controller.on_sample(Ok(1));
        }
        assert_eq!(controller.state(), AcquisitionState::Analyzing);
        controller.stop();
        assert_eq!(controller.state(), AcquisitionState::Idle);
        assert!(!controller.trigger.enabled);
        assert!(controller.pending_block().is_none());
    }

    #[test]
    fn service_trigger_reads_through_the_hardware() {
        let mut controller = sampling_controller(FaultPolicy::AbortCycle);
        controller.trigger.next = Ok(123);
        assert_eq!(controller.service_trigger(), None);
        assert_eq!(controller.buffer.as_slice(), &[123.0]);

        controller.trigger.next = Err(AnalogReadFault);
        assert_eq!(
            controller.service_trigger(),
            Some(CycleEvent::Aborted(CycleFault::AnalogRead))
        );
    }

    #[test]
    fn lifecycle_guards_ignore_out_of_order_calls() {
        let mut controller = sampling_controller(FaultPolicy::AbortCycle);
        // start() outside Idle does not reset an in-flight cycle
        controller.on_sample(Ok(9));
        controller.start();
        assert_eq!(controller.buffer.len(), 1);

        // rearm()/finish_analysis() outside their states do nothing
        controller.rearm();
        assert_eq!(controller.state(), AcquisitionState::Sampling);
        controller.finish_analysis(PeakResult {
            bin: 1,
            magnitude: 0.0,
        });
        assert_eq!(controller.state(), AcquisitionState::Sampling);
        assert_eq!(controller.completed_cycles(), 0);
    }
}
