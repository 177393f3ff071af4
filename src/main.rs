// SPDX-License-Identifier: Apache-2.0

//! RP2040 firmware: averages the internal temperature sensor over DMA-fed ADC blocks and
//! reports the reading, its trend and a low-temperature alert from a cyclic executor.
#![no_std]
#![no_main]
#![warn(missing_docs)]

use core::cell::RefCell;

use critical_section::Mutex;
use defmt::{debug, info, warn};
#[allow(unused_imports)]
use defmt_rtt as _;
use fugit::{ExtU64, MicrosDurationU32, RateExtU32};
#[allow(unused_imports)]
use panic_probe as _;
use rp2040_hal::{
    clocks::{init_clocks_and_plls, Clock},
    dma::{DMAExt, SingleChannel},
    entry,
    gpio::{FunctionI2C, Pin, Pins, PullUp},
    pac::{self, interrupt},
    pio::PIOExt,
    timer::{Alarm, Alarm0},
    usb::UsbBus,
    Adc, Sio, Timer, Watchdog, I2C,
};
use temp_cycle_dma::{
    acquisition::AcquisitionEngine,
    board::{
        self, matrix, usb, AdcDmaBlocks, Block, BoardSinks, MatrixAlert, MatrixTrend, OledDisplay,
        TrendLed, UsbConsole,
    },
    config::{TICK_PERIOD_MS, WINDOW_DURATION_US, XOSC_FREQ_HZ},
    interrupt::CompletionFlag,
    scheduler::{Scheduler, Settings},
};
use usb_device::class_prelude::UsbBusAllocator;
use ws2812_pio::Ws2812Direct;

/// Second-stage bootloader, from [rp2040-boot2](https://docs.rs/rp2040-boot2)
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

/// Period of the scheduler tick
const TICK_PERIOD: MicrosDurationU32 = MicrosDurationU32::millis(TICK_PERIOD_MS);

/// Raised by `DMA_IRQ_0` when a block transfer finishes
static DMA_DONE: CompletionFlag = CompletionFlag::new();

/// Everything the tick handler owns
struct TickContext {
    /// Cyclic executor and acquisition engine
    scheduler: Scheduler<AdcDmaBlocks, Timer>,
    /// Display, LEDs, matrix and console
    sinks: BoardSinks,
    /// Source of the tick interrupt
    alarm: Alarm0,
    /// Fed on every completed window
    #[cfg(feature = "watchdog")]
    watchdog: Watchdog,
}

/// Handed from `main` to `TIMER_IRQ_0` once, before the first tick
static FIRMWARE: Mutex<RefCell<Option<TickContext>>> = Mutex::new(RefCell::new(None));

/// Bring up the board, wait for a host, then leave everything to the tick interrupt
#[entry]
fn main() -> ! {
    info!("TempCycleDMA startup");
    let mut pac = pac::Peripherals::take().unwrap();
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
    let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let pins = Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // Presentation
    let sda: Pin<_, FunctionI2C, PullUp> = pins.gpio14.reconfigure();
    let scl: Pin<_, FunctionI2C, PullUp> = pins.gpio15.reconfigure();
    let i2c = I2C::i2c1(
        pac.I2C1,
        sda,
        scl,
        400.kHz(),
        &mut pac.RESETS,
        &clocks.system_clock,
    );
    let (mut pio, sm0, _, _, _) = pac.PIO0.split(&mut pac.RESETS);
    let matrix_pin: matrix::MatrixPin = pins.gpio7.into_function();
    matrix::install(Ws2812Direct::new(
        matrix_pin,
        &mut pio,
        sm0,
        clocks.peripheral_clock.freq(),
    ));
    let sinks = BoardSinks::new(
        OledDisplay::init(i2c),
        (
            TrendLed::init(pins.gpio13, pins.gpio11, pins.gpio12),
            MatrixTrend,
        ),
        MatrixAlert,
        UsbConsole,
    );

    // USB console, serviced from USBCTRL_IRQ
    let usb_bus = cortex_m::singleton!(: UsbBusAllocator<UsbBus> = UsbBusAllocator::new(UsbBus::new(
        pac.USBCTRL_REGS,
        pac.USBCTRL_DPRAM,
        clocks.usb_clock,
        true,
        &mut pac.RESETS,
    )))
    .unwrap();
    usb::install(usb_bus).unwrap();
    unsafe { pac::NVIC::unmask(pac::Interrupt::USBCTRL_IRQ) };

    // Temperature sensor FIFO, paused until the first block starts
    let adc = cortex_m::singleton!(: Adc = Adc::new(pac.ADC, &mut pac.RESETS)).unwrap();
    let mut temp_sensor = adc.take_temp_sensor().unwrap();
    let fifo = adc
        .build_fifo()
        .set_channel(&mut temp_sensor)
        .enable_dma()
        .start_paused();
    let mut dma = pac.DMA.split(&mut pac.RESETS);
    dma.ch0.enable_irq0();
    let block = Block::new(dma.ch0, board::create_block_buffer().unwrap());
    let engine = AcquisitionEngine::new(
        AdcDmaBlocks::new(fifo),
        block,
        timer,
        &DMA_DONE,
        WINDOW_DURATION_US.micros(),
    );
    let mut scheduler = Scheduler::new(engine, timer, Settings::default());
    unsafe { pac::NVIC::unmask(pac::Interrupt::DMA_IRQ_0) };

    info!("Waiting for a USB host");
    scheduler.wait_for_transport(&mut UsbConsole, &mut timer);

    let mut alarm = timer.alarm_0().unwrap();
    alarm.schedule(TICK_PERIOD).unwrap();
    alarm.enable_interrupt();

    #[cfg(feature = "watchdog")]
    watchdog.start(MicrosDurationU32::micros(
        temp_cycle_dma::config::WATCHDOG_TIMEOUT_US,
    ));

    debug!("critical_section: hand tick context to TIMER_IRQ_0");
    critical_section::with(|cs| {
        FIRMWARE.replace(
            cs,
            Some(TickContext {
                scheduler,
                sinks,
                alarm,
                #[cfg(feature = "watchdog")]
                watchdog,
            }),
        )
    });
    unsafe { pac::NVIC::unmask(pac::Interrupt::TIMER_IRQ_0) };

    loop {
        cortex_m::asm::wfi();
    }
}

/// Scheduler tick
#[interrupt]
fn TIMER_IRQ_0() {
    static mut CONTEXT: Option<TickContext> = None;

    if CONTEXT.is_none() {
        critical_section::with(|cs| *CONTEXT = FIRMWARE.borrow_ref_mut(cs).take());
    }
    let Some(context) = CONTEXT.as_mut() else {
        return;
    };

    context.alarm.clear_interrupt();
    if context.alarm.schedule(TICK_PERIOD).is_err() {
        warn!("Unable to reschedule the tick alarm");
    }

    if context.scheduler.tick(&mut context.sinks) {
        #[cfg(feature = "watchdog")]
        context.watchdog.feed();
    }
}

/// End of a DMA block
#[interrupt]
fn DMA_IRQ_0() {
    // Only channel 0 raises IRQ0
    unsafe { (*pac::DMA::ptr()).ints0().write(|w| w.bits(1)) };
    DMA_DONE.set();
}

/// USB device events
#[interrupt]
fn USBCTRL_IRQ() {
    usb::poll();
}
