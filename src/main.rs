//! Captures blocks of analog samples at a fixed rate and reports the
//! dominant frequency bin of each block over defmt/RTT.
#![no_std]
#![no_main]

use cortex_m::singleton;
use defmt::{debug, info, warn};
#[allow(unused_imports)]
use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
#[allow(unused_imports)]
use panic_probe as _;
use rp2040_hal::{
    adc::AdcPin,
    clocks::init_clocks_and_plls,
    entry,
    gpio::{bank0::Gpio26, FunctionSio, Pin, Pins, PullNone, SioInput},
    pac,
    pac::interrupt,
    prelude::*,
    Adc, Sio, Timer, Watchdog,
};

use tonewatch::{
    analysis::{SpectralAnalyzer, BLOCK_SIZE},
    components::AdcSampleTrigger,
    control::{AcquisitionController, CycleEvent, FaultPolicy},
    freq::FrequencyMapper,
    interrupt::CONTROLLER,
};

/// Second-stage bootloader, from [rp2040-boot2](https://docs.rs/rp2040-boot2)
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;
/// External high-speed crystal on the pico board is 12Mhz
pub const XOSC_FREQ_HZ: u32 = 12_000_000;
/// Nominal sampling rate for the capture FIFO
pub const SAMPLE_RATE_HZ: u32 = 44_100;
/// Idle interval between the end of one analysis and the next capture.
/// Throttles the reporting rate only; correctness does not depend on it.
pub const COOLDOWN_MS: u32 = 1_000;
/// Frequencies reported individually each cycle (`report_targets` feature)
#[cfg(feature = "report_targets")]
pub static TARGET_FREQS_HZ: [u32; 4] = [1_000, 2_000, 3_000, 4_000];

/// Main operation loop
#[entry]
fn main() -> ! {
    info!("Tone detection startup");
    let mut pac = pac::Peripherals::take().unwrap();
    let _core = pac::CorePeripherals::take().unwrap();
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let sio = Sio::new(pac.SIO);

    let clocks = init_clocks_and_plls(
        XOSC_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();
    let pins = Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

    // Setup ADC and the paced capture FIFO
    let adc = singleton!(: Adc = Adc::new(pac.ADC, &mut pac.RESETS)).unwrap();
    let adc_pin = singleton!(: AdcPin<Pin<Gpio26, FunctionSio<SioInput>, PullNone>> =
        AdcPin::new(pins.gpio26.into_floating_input()).unwrap())
    .unwrap();

    // Ex. 48 MHz ADC clock at 44.1 ksamples/s -> one conversion every
    // 1088.43 clk cycles (integer + 1/256 fractional divider)
    let adc_clock_hz = clocks.adc_clock.freq().to_Hz();
    let readings_fifo = adc
        .build_fifo()
        .set_channel(adc_pin)
        .clock_divider(
            ((adc_clock_hz / SAMPLE_RATE_HZ) - 1) as u16,
            ((adc_clock_hz % SAMPLE_RATE_HZ * 256) / SAMPLE_RATE_HZ) as u8,
        )
        .enable_interrupt(1)
        .start_paused();

    let mapper = FrequencyMapper::new(SAMPLE_RATE_HZ, BLOCK_SIZE);
    let mut analyzer = SpectralAnalyzer::new();

    debug!("critical_section: install controller");
    critical_section::with(|cs| {
        let mut slot = CONTROLLER.borrow_ref_mut(cs);
        *slot = Some(AcquisitionController::new(
            AdcSampleTrigger::new(readings_fifo),
            FaultPolicy::AbortCycle,
        ));
        if let Some(controller) = slot.as_mut() {
            controller.start();
        }
    });
    info!(
        "Sampling armed: {=usize} samples at {=u32} Hz ({=f32} Hz per bin)",
        BLOCK_SIZE,
        SAMPLE_RATE_HZ,
        mapper.bin_width()
    );
    unsafe { pac::NVIC::unmask(pac::Interrupt::ADC_IRQ_FIFO) }

    loop {
        // Sampling runs in ADC_IRQ_FIFO; this context hosts the deferred
        // analysis, reporting, and cooldown.
        cortex_m::asm::wfi();

        let fault = critical_section::with(|cs| {
            CONTROLLER
                .borrow_ref_mut(cs)
                .as_mut()
                .and_then(|controller| controller.take_fault())
        });
        if let Some(fault) = fault {
            warn!("Acquisition cycle aborted: {}. Restarting from idle", fault);
            critical_section::with(|cs| {
                if let Some(controller) = CONTROLLER.borrow_ref_mut(cs).as_mut() {
                    controller.start();
                }
            });
            continue;
        }

        // Copy the block out so the transform runs outside the critical
        // section; the trigger stays disabled the whole time regardless.
        let Some(block) = critical_section::with(|cs| {
            CONTROLLER
                .borrow_ref_mut(cs)
                .as_mut()
                .and_then(|controller| controller.pending_block().copied())
        }) else {
            continue;
        };

        let peak = analyzer.analyze(&block);
        let cycle = critical_section::with(|cs| {
            let mut slot = CONTROLLER.borrow_ref_mut(cs);
            slot.as_mut().map_or(0, |controller| {
                controller.finish_analysis(peak);
                controller.completed_cycles()
            })
        });

        info!(
            "Cycle {=u32}: peak {=u32} Hz (bin {=usize}, magnitude {=f32})",
            cycle,
            mapper.frequency_for_bin(peak.bin),
            peak.bin,
            peak.magnitude
        );
        #[cfg(feature = "report_targets")]
        for &freq in TARGET_FREQS_HZ.iter() {
            let bin = mapper.bin_for_frequency(freq as f32);
            info!(
                "  {=u32} Hz: magnitude {=f32}",
                freq,
                analyzer.magnitudes()[bin]
            );
        }
        #[cfg(feature = "trace_spectrum")]
        defmt::trace!("Full spectrum: {}", analyzer.magnitudes());

        timer.delay_ms(COOLDOWN_MS);
        critical_section::with(|cs| {
            if let Some(controller) = CONTROLLER.borrow_ref_mut(cs).as_mut() {
                controller.rearm();
            }
        });
    }
}

/// One conversion is ready in the capture FIFO: feed it to the controller.
/// Appends are constant-time; the transform itself never runs here.
#[interrupt]
fn ADC_IRQ_FIFO() {
    critical_section::with(|cs| {
        if let Some(controller) = CONTROLLER.borrow_ref_mut(cs).as_mut() {
            if let Some(CycleEvent::Aborted(fault)) = controller.service_trigger() {
                debug!("critical_section: cycle aborted in sample handler: {}", fault);
            }
        }
    });
}
