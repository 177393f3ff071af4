// SPDX-License-Identifier: Apache-2.0

//! Cooperative cyclic scheduler.
//!
//! A single periodic tick drives five slots, always in the same order. Each slot keeps its own
//! counter and fires every `every` ticks. All slots but the acquisition one stay silent until
//! the [`ReadinessGate`] opens on the first completed window; their counters do not move while
//! it is closed.

use core::fmt::{self, Write};

use embedded_hal::delay::DelayNs;
use heapless::String;
use portable_atomic::{AtomicBool, Ordering};

use crate::{
    acquisition::{AcquisitionEngine, BlockTransfer, Clock, CompletedReading},
    components::{AlertSink, Console, DisplaySink, IndicatorSink, Sinks, Transport},
    config, Instant,
    trend::{Trend, TrendAnalyzer},
};

/// Capacity of one console line
pub const LINE_CAPACITY: usize = 64;

/// Number of scheduler slots
pub const SLOT_COUNT: usize = 5;

/// One-time latch raised by the first completed acquisition window. Never reset.
pub struct ReadinessGate(AtomicBool);

impl ReadinessGate {
    /// Create a closed gate
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Open the gate. Returns `true` only for the call that actually opened it.
    pub fn open(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Whether the first reading is available
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Slots are not armed yet; the console link is not up
    WaitingForTransport,
    /// Every tick dispatches the slots
    Running,
}

/// Task body attached to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Task {
    /// Step the acquisition engine
    Acquire,
    /// Classify the latest reading
    Trend,
    /// Redraw the display
    Display,
    /// Update the trend light
    Indicator,
    /// Blink the alert light when too cold
    Alert,
}

/// Periodic slot descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// What runs when the slot fires
    task: Task,
    /// Fire once every this many (ungated) ticks
    every: u8,
    /// Ticks counted since the last firing
    elapsed: u8,
    /// Wait for the readiness gate before counting
    gated: bool,
}

impl Slot {
    /// Create a slot with a cleared counter
    pub const fn new(task: Task, every: u8, gated: bool) -> Self {
        Self {
            task,
            every,
            elapsed: 0,
            gated,
        }
    }

    /// Count one tick. Returns `true` if the slot fires on it.
    fn fire(&mut self, gate_open: bool) -> bool {
        if self.gated && !gate_open {
            return false;
        }
        self.elapsed += 1;
        if self.elapsed < self.every {
            return false;
        }
        self.elapsed = 0;
        true
    }

    /// Task run by this slot
    pub fn task(&self) -> Task {
        self.task
    }

    /// Ticks counted since the last firing
    pub fn elapsed(&self) -> u8 {
        self.elapsed
    }
}

/// Values published by one slot and read by the others
#[derive(Default)]
pub struct SharedState {
    /// Last completed acquisition window
    latest: Option<CompletedReading>,
    /// Last classification. `None` until the trend slot first ran.
    trend: Option<Trend>,
    /// Raised on the first completed window
    gate: ReadinessGate,
}

impl SharedState {
    /// Last completed reading
    pub fn latest(&self) -> Option<CompletedReading> {
        self.latest
    }

    /// Last trend classification
    pub fn trend(&self) -> Option<Trend> {
        self.trend
    }

    /// Readiness gate
    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    /// Shortcut for `gate().is_open()`
    pub fn first_reading_done(&self) -> bool {
        self.gate.is_open()
    }
}

/// Tunables of the scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Dependent slots fire once every this many ticks
    pub subsample_ticks: u8,
    /// Tolerance handed to the [`TrendAnalyzer`], in °C
    pub trend_tolerance: f32,
    /// Below this the alert light blinks, in °C
    pub alert_low_celsius: f32,
    /// Poll interval of [`Scheduler::wait_for_transport`]
    pub transport_poll_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subsample_ticks: config::SUBSAMPLE_TICKS,
            trend_tolerance: config::TREND_TOLERANCE_C,
            alert_low_celsius: config::ALERT_LOW_CELSIUS,
            transport_poll_ms: config::TRANSPORT_POLL_MS,
        }
    }
}

/// Owns the slots, the acquisition engine and the state they share
pub struct Scheduler<T: BlockTransfer, C: Clock> {
    /// Lifecycle phase
    phase: Phase,
    /// Driven by the acquisition slot
    engine: AcquisitionEngine<T, C>,
    /// Driven by the trend slot
    analyzer: TrendAnalyzer,
    /// Used to time the task bodies
    clock: C,
    /// Slots in dispatch order
    slots: [Slot; SLOT_COUNT],
    /// Published values and readiness gate
    shared: SharedState,
    /// Alert blink phase
    blink_on: bool,
    /// Tunables
    settings: Settings,
}

impl<T: BlockTransfer, C: Clock> Scheduler<T, C> {
    /// Create a scheduler waiting for its transport. `clock` times the task bodies and may be
    /// a copy of the engine's clock.
    pub fn new(engine: AcquisitionEngine<T, C>, clock: C, settings: Settings) -> Self {
        let every = settings.subsample_ticks;
        Self {
            phase: Phase::WaitingForTransport,
            engine,
            analyzer: TrendAnalyzer::new(settings.trend_tolerance),
            clock,
            slots: [
                Slot::new(Task::Acquire, 1, false),
                Slot::new(Task::Trend, every, true),
                Slot::new(Task::Display, every, true),
                Slot::new(Task::Indicator, every, true),
                Slot::new(Task::Alert, every, true),
            ],
            shared: SharedState::default(),
            blink_on: false,
            settings,
        }
    }

    /// Block until `transport` reports a host, polling every
    /// [`transport_poll_ms`](Settings::transport_poll_ms), then arm the slots.
    ///
    /// This is the only blocking call and happens before the first tick.
    pub fn wait_for_transport<P: Transport, Dl: DelayNs>(
        &mut self,
        transport: &mut P,
        delay: &mut Dl,
    ) {
        while !transport.is_connected() {
            delay.delay_ms(self.settings.transport_poll_ms);
        }
        info!("Transport connected");
        self.arm();
    }

    /// Arm the slots without waiting for a transport
    pub fn arm(&mut self) {
        self.phase = Phase::Running;
    }

    /// Dispatch every slot once, in order. Does nothing until the scheduler is armed.
    ///
    /// Returns `true` if an acquisition window completed during this tick.
    pub fn tick<D, I, A, W>(&mut self, sinks: &mut Sinks<D, I, A, W>) -> bool
    where
        D: DisplaySink,
        I: IndicatorSink,
        A: AlertSink,
        W: Console,
    {
        if self.phase != Phase::Running {
            return false;
        }

        let mut completed = false;
        for index in 0..SLOT_COUNT {
            // Re-read per slot so dependents see a gate opened earlier in this tick
            let gate_open = self.shared.gate.is_open();
            if !self.slots[index].fire(gate_open) {
                continue;
            }
            match self.slots[index].task {
                Task::Acquire => completed = self.acquire(&mut sinks.console),
                Task::Trend => self.update_trend(&mut sinks.console),
                Task::Display => self.refresh_display(&mut sinks.display, &mut sinks.console),
                Task::Indicator => {
                    self.refresh_indicator(&mut sinks.indicator, &mut sinks.console)
                }
                Task::Alert => self.refresh_alert(&mut sinks.alert, &mut sinks.console),
            }
        }
        completed
    }

    /// Clear every slot counter, the blink phase and the trend history.
    ///
    /// The readiness gate and the latest reading are kept: the gate never closes again. The
    /// next trend classification starts over from [`Trend::Unknown`].
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| slot.elapsed = 0);
        self.blink_on = false;
        self.analyzer.reset();
        self.shared.trend = None;
    }

    /// Lifecycle phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Values shared between the slots
    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    /// Slots in dispatch order
    pub fn slots(&self) -> &[Slot; SLOT_COUNT] {
        &self.slots
    }

    /// The acquisition engine
    pub fn engine(&self) -> &AcquisitionEngine<T, C> {
        &self.engine
    }

    /// Step acquisition and publish a finished window
    fn acquire<W: Console>(&mut self, console: &mut W) -> bool {
        let started = self.clock.now();
        if !self.engine.advance() {
            return false;
        }
        let Some(reading) = self.engine.latest() else {
            return false;
        };
        self.shared.latest = Some(reading);
        let secs = self.seconds_since(started);
        emit(
            console,
            format_args!("Temperature: {:.2} C | {:.3}s", reading.celsius, secs),
        );

        if self.shared.gate.open() {
            info!("First reading complete, dependent tasks released");
            emit(
                console,
                format_args!(">> First reading complete. Trend, display, LEDs released."),
            );
        }
        true
    }

    /// Classify the latest reading
    fn update_trend<W: Console>(&mut self, console: &mut W) {
        let Some(reading) = self.shared.latest else {
            return;
        };
        let started = self.clock.now();
        let trend = self.analyzer.classify(reading.celsius);
        let secs = self.seconds_since(started);
        self.shared.trend = Some(trend);
        emit(
            console,
            format_args!("Trend -> {} | {:.3}s", trend.label(), secs),
        );
    }

    /// Show temperature and trend on the display
    fn refresh_display<D: DisplaySink, W: Console>(&mut self, display: &mut D, console: &mut W) {
        let (Some(reading), Some(trend)) = (self.shared.latest, self.shared.trend) else {
            return;
        };
        let started = self.clock.now();
        display.render(reading.celsius, trend);
        let secs = self.seconds_since(started);
        emit(console, format_args!("Display -> {:.2} C | {:.3}s", reading.celsius, secs));
    }

    /// Show the trend on the indicator light
    fn refresh_indicator<I: IndicatorSink, W: Console>(
        &mut self,
        indicator: &mut I,
        console: &mut W,
    ) {
        let Some(trend) = self.shared.trend else {
            return;
        };
        let started = self.clock.now();
        indicator.show_trend(trend);
        let secs = self.seconds_since(started);
        emit(
            console,
            format_args!("Indicator -> {} | {:.3}s", trend.label(), secs),
        );
    }

    /// Blink the alert while below the low threshold, keep it off otherwise
    fn refresh_alert<A: AlertSink, W: Console>(&mut self, alert: &mut A, console: &mut W) {
        let Some(reading) = self.shared.latest else {
            return;
        };
        let lit = if reading.celsius < self.settings.alert_low_celsius {
            self.blink_on = !self.blink_on;
            self.blink_on
        } else {
            self.blink_on = false;
            false
        };
        let started = self.clock.now();
        alert.set(lit);
        let secs = self.seconds_since(started);
        emit(
            console,
            format_args!("Alert -> {} | {:.3}s", if lit { "on" } else { "off" }, secs),
        );
    }

    /// Seconds elapsed since `started`
    fn seconds_since(&self, started: Instant) -> f32 {
        self.clock
            .now()
            .checked_duration_since(started)
            .map_or(0.0, |elapsed| elapsed.to_micros() as f32 / 1_000_000.0)
    }
}

/// Format one console line and hand it to `console`
fn emit<W: Console>(console: &mut W, args: fmt::Arguments<'_>) {
    let mut line: String<LINE_CAPACITY> = String::new();
    if line.write_fmt(args).is_err() {
        warn!("Console line truncated to {} bytes", LINE_CAPACITY);
    }
    console.write_line(&line);
}
