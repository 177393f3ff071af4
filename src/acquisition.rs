// SPDX-License-Identifier: Apache-2.0

//! Non-blocking ADC + DMA acquisition of averaged temperature readings.
//!
//! One acquisition window is split into many fixed-size DMA blocks so a single small buffer can
//! be reused instead of one sized for the whole window. The [`AcquisitionEngine`] performs at
//! most one bounded unit of work per call to [`advance`](AcquisitionEngine::advance) and never
//! waits on the hardware.

use crate::{convert, interrupt::CompletionFlag, Duration, Instant};

/// Monotonic time source
pub trait Clock {
    /// Current time
    fn now(&self) -> Instant;
}

/// A DMA channel moving blocks of raw codes out of the ADC FIFO.
///
/// The buffer travels with the transfer: while a block is in flight it is owned by
/// [`InFlight`](BlockTransfer::InFlight) and cannot be read.
pub trait BlockTransfer {
    /// Channel and buffer at rest. The slice length is the block size.
    type Idle: AsRef<[u16]>;
    /// Handle of a transfer targeting the buffer
    type InFlight;

    /// Drain the ADC FIFO, then start a transfer of one full block. Returns immediately.
    fn start(&mut self, block: Self::Idle) -> Self::InFlight;

    /// Stop sampling and reclaim the filled block. Only called once the transfer completed.
    fn finish(&mut self, transfer: Self::InFlight) -> Self::Idle;
}

/// Observable state of the acquisition state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquisitionState {
    /// No window in progress
    Idle,
    /// Window open, next block not yet requested
    Starting,
    /// A block transfer is in flight
    AwaitingTransfer,
}

/// Running sum for the window in progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulationContext {
    /// Sum of all converted samples, in °C
    pub sum: f32,
    /// Number of samples added to `sum`
    pub sample_count: u32,
    /// When the window opened. Fixed for the whole window.
    pub window_start: Instant,
}

impl AccumulationContext {
    /// Empty context for a window opening at `window_start`
    fn begin(window_start: Instant) -> Self {
        Self {
            sum: 0.0,
            sample_count: 0,
            window_start,
        }
    }

    /// Convert and add a finished block
    fn add_block(&mut self, block: &[u16]) {
        self.sum += convert::block_sum(block);
        self.sample_count += block.len() as u32;
    }

    /// Average so far. Only meaningful once a block was added.
    fn mean(&self) -> f32 {
        self.sum / self.sample_count as f32
    }
}

/// Result of one finished acquisition window
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompletedReading {
    /// Mean temperature over the window, in °C
    pub celsius: f32,
    /// Number of samples averaged
    pub samples: u32,
}

/// State machine payload. The block and the transfer are never held at the same time.
enum Stage<T: BlockTransfer> {
    /// Waiting for the next window
    Idle(T::Idle),
    /// Window open, block ready to be handed to the DMA
    Starting(T::Idle),
    /// Block owned by the DMA until the completion flag is raised
    AwaitingTransfer(T::InFlight),
}

/// Produces one averaged temperature per acquisition window
pub struct AcquisitionEngine<T: BlockTransfer, C: Clock> {
    /// DMA channel feeding the blocks
    dma: T,
    /// Time source for window bookkeeping
    clock: C,
    /// Raised by the DMA interrupt handler
    flag: &'static CompletionFlag,
    /// Minimum length of a window
    window: Duration,
    /// Always `Some` outside of [`AcquisitionEngine::advance`]
    stage: Option<Stage<T>>,
    /// Accumulator of the current window
    context: AccumulationContext,
    /// Last finished window
    latest: Option<CompletedReading>,
}

impl<T: BlockTransfer, C: Clock> AcquisitionEngine<T, C> {
    /// Panic message raised if a previous step unwound mid-transition
    const NO_STAGE_PANIC_MSG: &'static str =
        "Acquisition stage lost during a previous state transition";
    /// Panic message raised when the engine is given a block that cannot hold a sample
    const EMPTY_BLOCK_PANIC_MSG: &'static str = "Acquisition block must hold at least one sample";

    /// Create an idle engine. `block` is the buffer (and channel) reused for every transfer.
    ///
    /// # Panics
    ///
    /// If `block` is empty. Every finished window then holds at least one sample.
    pub fn new(
        dma: T,
        block: T::Idle,
        clock: C,
        flag: &'static CompletionFlag,
        window: Duration,
    ) -> Self {
        assert!(!block.as_ref().is_empty(), "{}", Self::EMPTY_BLOCK_PANIC_MSG);
        let context = AccumulationContext::begin(clock.now());
        Self {
            dma,
            clock,
            flag,
            window,
            stage: Some(Stage::Idle(block)),
            context,
            latest: None,
        }
    }

    /// Step the state machine once.
    ///
    /// Returns `true` exactly on the call that finishes a window; the new average is then
    /// available from [`latest_average`](Self::latest_average). If the completion flag never
    /// rises the engine stays in [`AcquisitionState::AwaitingTransfer`] indefinitely.
    pub fn advance(&mut self) -> bool {
        let stage = self.stage.take().expect(Self::NO_STAGE_PANIC_MSG);
        let (next, completed) = match stage {
            Stage::Idle(block) => {
                self.context = AccumulationContext::begin(self.clock.now());
                (Stage::Starting(block), false)
            }
            Stage::Starting(block) => {
                self.flag.clear();
                (Stage::AwaitingTransfer(self.dma.start(block)), false)
            }
            Stage::AwaitingTransfer(transfer) => {
                if !self.flag.take() {
                    (Stage::AwaitingTransfer(transfer), false)
                } else {
                    let block = self.dma.finish(transfer);
                    self.context.add_block(block.as_ref());

                    #[cfg(feature = "trace_blocks")]
                    trace!(
                        "Block done: {} samples so far, partial mean {}",
                        self.context.sample_count,
                        self.context.mean()
                    );

                    if self.window_elapsed() {
                        self.finalize();
                        (Stage::Idle(block), true)
                    } else {
                        (Stage::Starting(block), false)
                    }
                }
            }
        };
        self.stage = Some(next);
        completed
    }

    /// Most recent window average, in °C. Reads 0.0 until the first window finishes.
    pub fn latest_average(&self) -> f32 {
        self.latest.map_or(0.0, |reading| reading.celsius)
    }

    /// Most recent window result, if any
    pub fn latest(&self) -> Option<CompletedReading> {
        self.latest
    }

    /// Current state of the state machine
    pub fn state(&self) -> AcquisitionState {
        match self.stage.as_ref().expect(Self::NO_STAGE_PANIC_MSG) {
            Stage::Idle(_) => AcquisitionState::Idle,
            Stage::Starting(_) => AcquisitionState::Starting,
            Stage::AwaitingTransfer(_) => AcquisitionState::AwaitingTransfer,
        }
    }

    /// Accumulator of the window in progress (or of the last one, while idle)
    pub fn context(&self) -> &AccumulationContext {
        &self.context
    }

    /// Whether the configured window length has passed since the window opened
    fn window_elapsed(&self) -> bool {
        self.clock
            .now()
            .checked_duration_since(self.context.window_start)
            .is_some_and(|elapsed| elapsed >= self.window)
    }

    /// Store the average of the window. At least one block has been added at this point.
    fn finalize(&mut self) {
        let reading = CompletedReading {
            celsius: self.context.mean(),
            samples: self.context.sample_count,
        };
        debug!(
            "Window complete: {} samples, mean {} C",
            reading.samples, reading.celsius
        );
        self.latest = Some(reading);
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use fugit::ExtU64;

    use super::*;
    use crate::convert::celsius;

    /// Clock advanced by hand
    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<u64>>);

    impl ManualClock {
        fn advance_us(&self, us: u64) {
            self.0.set(self.0.get() + us);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            Instant::from_ticks(self.0.get())
        }
    }

    /// Fills each finished block with the next scripted code, repeating the last one
    struct ScriptedDma {
        codes: Vec<u16>,
        next: usize,
        starts: usize,
    }

    impl ScriptedDma {
        fn new(codes: Vec<u16>) -> Self {
            Self {
                codes,
                next: 0,
                starts: 0,
            }
        }
    }

    impl BlockTransfer for ScriptedDma {
        type Idle = Vec<u16>;
        type InFlight = Vec<u16>;

        fn start(&mut self, block: Vec<u16>) -> Vec<u16> {
            self.starts += 1;
            block
        }

        fn finish(&mut self, mut transfer: Vec<u16>) -> Vec<u16> {
            let code = self.codes[self.next.min(self.codes.len() - 1)];
            self.next += 1;
            transfer.iter_mut().for_each(|sample| *sample = code);
            transfer
        }
    }

    fn leaked_flag() -> &'static CompletionFlag {
        Box::leak(Box::new(CompletionFlag::new()))
    }

    fn engine(
        codes: Vec<u16>,
        block_len: usize,
        window_us: u64,
    ) -> (AcquisitionEngine<ScriptedDma, ManualClock>, ManualClock, &'static CompletionFlag) {
        let clock = ManualClock::default();
        let flag = leaked_flag();
        let engine = AcquisitionEngine::new(
            ScriptedDma::new(codes),
            vec![0u16; block_len],
            clock.clone(),
            flag,
            window_us.micros(),
        );
        (engine, clock, flag)
    }

    /// Tick until the engine waits on the DMA, then let one block land `block_us` later.
    /// Returns the result of the tick that consumed the block.
    fn land_block(
        engine: &mut AcquisitionEngine<ScriptedDma, ManualClock>,
        clock: &ManualClock,
        flag: &CompletionFlag,
        block_us: u64,
    ) -> bool {
        while engine.state() != AcquisitionState::AwaitingTransfer {
            assert!(!engine.advance());
        }
        clock.advance_us(block_us);
        flag.set();
        engine.advance()
    }

    #[test]
    fn walks_through_states() {
        let (mut engine, clock, flag) = engine(vec![900], 4, 500_000);
        assert_eq!(engine.state(), AcquisitionState::Idle);
        assert!(!engine.advance());
        assert_eq!(engine.state(), AcquisitionState::Starting);
        assert!(!engine.advance());
        assert_eq!(engine.state(), AcquisitionState::AwaitingTransfer);
        assert_eq!(engine.dma.starts, 1);

        // No completion yet: stays put
        assert!(!engine.advance());
        assert_eq!(engine.state(), AcquisitionState::AwaitingTransfer);

        clock.advance_us(100_000);
        flag.set();
        assert!(!engine.advance());
        assert_eq!(engine.state(), AcquisitionState::Starting);
        assert!(!flag.take());
    }

    #[test]
    fn completes_after_ceil_window_over_block() {
        // 500 ms window, 200 ms blocks -> third block closes the window
        let (mut engine, clock, flag) = engine(vec![870], 8, 500_000);
        assert!(!land_block(&mut engine, &clock, flag, 200_000));
        assert!(!land_block(&mut engine, &clock, flag, 200_000));
        assert!(land_block(&mut engine, &clock, flag, 200_000));
        assert_eq!(engine.state(), AcquisitionState::Idle);
        assert_eq!(engine.dma.starts, 3);
        assert_eq!(engine.latest().map(|r| r.samples), Some(24));
    }

    #[test]
    fn exact_multiple_completes_on_boundary() {
        let (mut engine, clock, flag) = engine(vec![870], 8, 500_000);
        assert!(!land_block(&mut engine, &clock, flag, 250_000));
        assert!(land_block(&mut engine, &clock, flag, 250_000));
    }

    #[test]
    fn average_is_mean_of_all_blocks() {
        let codes = vec![860, 880, 900];
        let (mut engine, clock, flag) = engine(codes.clone(), 5, 300_000);
        let results: Vec<bool> = (0..3)
            .map(|_| land_block(&mut engine, &clock, flag, 100_000))
            .collect();
        assert_eq!(results, [false, false, true]);

        let expected = codes.iter().map(|&c| celsius(c)).sum::<f32>() / codes.len() as f32;
        assert!((engine.latest_average() - expected).abs() < 1e-3);
        assert_eq!(engine.context().sample_count, 15);
    }

    #[test]
    fn context_resets_on_new_window() {
        let (mut engine, clock, flag) = engine(vec![870, 990], 4, 100_000);
        assert!(land_block(&mut engine, &clock, flag, 150_000));
        let first = engine.latest_average();

        clock.advance_us(42);
        assert!(!engine.advance());
        assert_eq!(engine.state(), AcquisitionState::Starting);
        assert_eq!(engine.context().sample_count, 0);
        assert_eq!(engine.context().sum, 0.0);
        assert_eq!(engine.context().window_start.ticks(), 150_042);

        assert!(land_block(&mut engine, &clock, flag, 150_000));
        assert!(engine.latest_average() < first);
    }

    #[test]
    fn stalled_transfer_never_completes() {
        let (mut engine, clock, flag) = engine(vec![900], 4, 100_000);
        assert!(land_block(&mut engine, &clock, flag, 200_000));
        let before = engine.latest_average();

        for _ in 0..1_000 {
            clock.advance_us(500_000);
            assert!(!engine.advance());
        }
        assert_eq!(engine.state(), AcquisitionState::AwaitingTransfer);
        assert_eq!(engine.latest_average(), before);
    }

    #[test]
    fn latest_average_is_idempotent() {
        let (mut engine, clock, flag) = engine(vec![900], 4, 100_000);
        assert_eq!(engine.latest_average(), 0.0);
        assert_eq!(engine.latest(), None);
        assert!(land_block(&mut engine, &clock, flag, 200_000));
        let first = engine.latest_average();
        assert_eq!(engine.latest_average(), first);
        assert!(!engine.advance());
        assert_eq!(engine.latest_average(), first);
    }

    #[test]
    #[should_panic(expected = "at least one sample")]
    fn empty_block_is_rejected() {
        let _ = engine(vec![900], 0, 100_000);
    }
}
