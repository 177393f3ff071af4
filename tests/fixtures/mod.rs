//! Test doubles for the hardware seams: DMA, clock, sinks, transport and delay.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use embedded_hal::delay::DelayNs;
use fugit::ExtU64;
use temp_cycle_dma::{
    acquisition::{AcquisitionEngine, BlockTransfer, Clock},
    components::{AlertSink, Console, DisplaySink, IndicatorSink, Sinks, Transport},
    config::{TICK_PERIOD_MS, WINDOW_DURATION_US},
    interrupt::CompletionFlag,
    scheduler::{Scheduler, Settings},
    trend::Trend,
    Instant,
};

/// Raw code reading roughly 27 °C
pub const CODE_ROOM: u16 = 876;
/// Raw code reading about -2.8 °C, below the alert threshold
pub const CODE_COLD: u16 = 940;

// ============================================================================
// Clock
// ============================================================================

/// Clock advanced by hand, shared between the engine, the scheduler and the test
#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn advance_us(&self, us: u64) {
        self.0.set(self.0.get() + us);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_ticks(self.0.get())
    }
}

// ============================================================================
// DMA
// ============================================================================

/// Test-side handle on a [`FakeDma`]
#[derive(Clone, Default)]
pub struct DmaControl {
    /// Raise the completion flag as soon as a transfer starts
    pub auto_complete: Rc<Cell<bool>>,
    /// Number of transfers started
    pub starts: Rc<Cell<usize>>,
    /// Code written into each finished block, in order; the last one repeats
    pub codes: Rc<RefCell<Vec<u16>>>,
    /// Index of the next code
    next: Rc<Cell<usize>>,
}

impl DmaControl {
    pub fn stall(&self) {
        self.auto_complete.set(false);
    }
}

/// DMA whose blocks are filled from a script
pub struct FakeDma {
    control: DmaControl,
    flag: &'static CompletionFlag,
}

impl BlockTransfer for FakeDma {
    type Idle = Vec<u16>;
    type InFlight = Vec<u16>;

    fn start(&mut self, block: Vec<u16>) -> Vec<u16> {
        self.control.starts.set(self.control.starts.get() + 1);
        if self.control.auto_complete.get() {
            // Models the interrupt firing before the next tick
            self.flag.set();
        }
        block
    }

    fn finish(&mut self, mut transfer: Vec<u16>) -> Vec<u16> {
        let codes = self.control.codes.borrow();
        let index = self.control.next.get().min(codes.len() - 1);
        self.control.next.set(self.control.next.get() + 1);
        transfer.iter_mut().for_each(|sample| *sample = codes[index]);
        transfer
    }
}

pub fn leaked_flag() -> &'static CompletionFlag {
    Box::leak(Box::new(CompletionFlag::new()))
}

/// Engine over a [`FakeDma`]. Completion is manual unless `auto_complete` is set.
pub fn engine(
    codes: &[u16],
    block_len: usize,
    window_us: u64,
    auto_complete: bool,
) -> (
    AcquisitionEngine<FakeDma, ManualClock>,
    ManualClock,
    DmaControl,
    &'static CompletionFlag,
) {
    let clock = ManualClock::default();
    let flag = leaked_flag();
    let control = DmaControl::default();
    control.auto_complete.set(auto_complete);
    *control.codes.borrow_mut() = codes.to_vec();
    let dma = FakeDma {
        control: control.clone(),
        flag,
    };
    let engine = AcquisitionEngine::new(
        dma,
        vec![0u16; block_len],
        clock.clone(),
        flag,
        window_us.micros(),
    );
    (engine, clock, control, flag)
}

// ============================================================================
// Sinks
// ============================================================================

#[derive(Default)]
pub struct RecordingDisplay(pub Vec<(f32, Trend)>);

impl DisplaySink for RecordingDisplay {
    fn render(&mut self, celsius: f32, trend: Trend) {
        self.0.push((celsius, trend));
    }
}

#[derive(Default)]
pub struct RecordingIndicator(pub Vec<Trend>);

impl IndicatorSink for RecordingIndicator {
    fn show_trend(&mut self, trend: Trend) {
        self.0.push(trend);
    }
}

#[derive(Default)]
pub struct RecordingAlert(pub Vec<bool>);

impl AlertSink for RecordingAlert {
    fn set(&mut self, lit: bool) {
        self.0.push(lit);
    }
}

#[derive(Default)]
pub struct RecordingConsole(pub Vec<String>);

impl RecordingConsole {
    pub fn count_starting_with(&self, prefix: &str) -> usize {
        self.0.iter().filter(|line| line.starts_with(prefix)).count()
    }
}

impl Console for RecordingConsole {
    fn write_line(&mut self, line: &str) {
        self.0.push(line.to_string());
    }
}

pub type TestSinks = Sinks<RecordingDisplay, RecordingIndicator, RecordingAlert, RecordingConsole>;

pub fn sinks() -> TestSinks {
    Sinks::new(
        RecordingDisplay::default(),
        RecordingIndicator::default(),
        RecordingAlert::default(),
        RecordingConsole::default(),
    )
}

// ============================================================================
// Transport and delay
// ============================================================================

/// Reports a connection after a number of polls
pub struct FakeTransport {
    pub connect_after: usize,
    pub polls: usize,
}

impl Transport for FakeTransport {
    fn is_connected(&mut self) -> bool {
        self.polls += 1;
        self.polls > self.connect_after
    }
}

/// Records requested delays instead of sleeping
#[derive(Default)]
pub struct CountingDelay {
    pub calls: Vec<u32>,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms);
    }
}

// ============================================================================
// Scheduler
// ============================================================================

pub type TestScheduler = Scheduler<FakeDma, ManualClock>;

/// Armed scheduler with the reference window whose DMA completes within one tick
pub fn armed_scheduler(codes: &[u16]) -> (TestScheduler, ManualClock, DmaControl) {
    let (engine, clock, control, _) = engine(codes, 16, WINDOW_DURATION_US, true);
    let mut scheduler = Scheduler::new(engine, clock.clone(), Settings::default());
    scheduler.arm();
    (scheduler, clock, control)
}

/// Run `count` ticks one tick period apart. Returns each tick's result.
pub fn run_ticks(
    scheduler: &mut TestScheduler,
    sinks: &mut TestSinks,
    clock: &ManualClock,
    count: usize,
) -> Vec<bool> {
    (0..count)
        .map(|_| {
            let completed = scheduler.tick(sinks);
            clock.advance_us(TICK_PERIOD_MS as u64 * 1_000);
            completed
        })
        .collect()
}
