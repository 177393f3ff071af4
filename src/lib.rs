//! This [RP2040](https://docs.rs/rp2040-hal) project averages the on-chip temperature sensor
//! over fixed acquisition windows using the ADC FIFO and DMA, classifies the short-term trend,
//! and presents both on an OLED, an RGB LED, a 5x5 WS2812 matrix and a USB console.
//!
//! Everything is driven by a single 500 ms hardware timer tick. The
//! [`Scheduler`](scheduler::Scheduler) dispatches five cooperative slots on each tick:
//!
//! ```text
//! tick ─▶ Acquire ─(every tick)─▶ AcquisitionEngine::advance ─▶ SharedState
//!      ─▶ Trend     ─┐
//!      ─▶ Display   ─┤ every 3rd tick, only once the first window completed
//!      ─▶ Indicator ─┤
//!      ─▶ Alert     ─┘
//! ```
//!
//! The core of the crate is platform independent and `no_std`. Hardware enters only through
//! the traits in [`acquisition`] and [`components`]; the RP2040 implementations live in
//! `board` and the firmware binary.
//!
//! ## Crate features
//!
//! - `rp2040`: Builds the firmware binary and the `board` adapters (ADC/DMA, OLED, LEDs, matrix,
//!   USB console). Implies `defmt`.
//! - `defmt`: Routes log output to [defmt](https://docs.rs/defmt) instead of the
//!   [`log`](https://docs.rs/log) facade used on the host.
//! - `watchdog`: Arms the hardware watchdog. It is only fed when an acquisition window
//!   completes, so a stalled DMA transfer resets the chip.
//! - `trace_blocks`: Logs the partial mean of every DMA block. Noisy!
//!
//! ## Flashing
//!
//! ```text
//! cargo firmware        # probe-rs run, release profile
//! cargo firmware-wdt    # same, with the watchdog armed
//! ```

// Copyright 2025 TempCycleDMA contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), feature(doc_auto_cfg), feature(doc_cfg_hide))]

#[macro_use]
mod fmt;

pub mod acquisition;
pub mod components;
pub mod config;
pub mod convert;
pub mod interrupt;
pub mod matrix;
pub mod scheduler;
pub mod trend;

#[cfg(feature = "rp2040")]
pub mod board;

/// Microsecond timestamps, matching the RP2040 `TIMER` peripheral.
pub type Instant = fugit::TimerInstantU64<1_000_000>;
/// Microsecond durations between two [`Instant`]s.
pub type Duration = fugit::MicrosDurationU64;
