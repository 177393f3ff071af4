// SPDX-License-Identifier: Apache-2.0

//! Compile-time configuration.
//!
//! Timing values assume the reference cadence: one scheduler tick every 500 ms, with the
//! dependent slots firing every third tick (1.5 s).

/// External high-speed crystal on the pico board is 12Mhz
pub const XOSC_FREQ_HZ: u32 = 12_000_000;

/// Period of the hardware timer tick driving every scheduler slot
pub const TICK_PERIOD_MS: u32 = 500;

/// Length of one acquisition window. Blocks keep being transferred until at least this much
/// time has passed since the window started.
pub const WINDOW_DURATION_US: u64 = 500_000;

/// Number of raw samples moved by one DMA transfer.
///
/// A 10k block of `u16` costs 20 KiB of SRAM and takes 20 ms at the ADC's default 500 ksamples/s.
pub const BLOCK_SAMPLES: usize = 10_000;

/// Dependent slots (trend, display, indicator, alert) fire once every this many ticks
pub const SUBSAMPLE_TICKS: u8 = 3;

/// Readings closer than this to the previous one are classified as stable, in °C
pub const TREND_TOLERANCE_C: f32 = 0.2;

/// Below this temperature the alert blinks on the LED matrix, in °C
pub const ALERT_LOW_CELSIUS: f32 = 1.0;

/// Number of pixels in the WS2812 matrix (5x5)
pub const MATRIX_PIXELS: usize = 25;

/// Global brightness applied to every matrix pixel, out of 255
pub const MATRIX_BRIGHTNESS: u8 = 32;

/// Poll interval while waiting for the USB console to be opened
pub const TRANSPORT_POLL_MS: u32 = 100;

/// Watchdog timeout when the `watchdog` feature is enabled.
///
/// A window spans at least three ticks (start, transfer, collect), so this leaves room for
/// one late window before the chip resets.
pub const WATCHDOG_TIMEOUT_US: u32 = 4_000_000;
