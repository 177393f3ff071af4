// SPDX-License-Identifier: Apache-2.0

//! RP2040 implementations of the acquisition and presentation interfaces.
//!
//! Pin assignment (BitDogLab layout):
//!
//! | Function | Pins |
//! |----------|------|
//! | OLED SSD1306, I2C1 | GPIO14 (SDA), GPIO15 (SCL) |
//! | Trend RGB LED | GPIO13 (red), GPIO11 (green), GPIO12 (blue) |
//! | WS2812 5x5 matrix (trend colour, alert blink) | GPIO7, PIO0 SM0 |
//! | Temperature sensor | ADC input 4, DMA channel 0, `DMA_IRQ_0` |

pub mod adc_dma;
pub mod leds;
pub mod matrix;
pub mod oled;
pub mod usb;

pub use adc_dma::{create_block_buffer, AdcDmaBlocks, Block};
pub use leds::TrendLed;
pub use matrix::{MatrixAlert, MatrixTrend};
pub use oled::OledDisplay;
pub use usb::UsbConsole;

use crate::components::Sinks;

/// Sinks wired on the board. The trend shows on both the RGB LED and the matrix.
pub type BoardSinks = Sinks<OledDisplay, (TrendLed, MatrixTrend), MatrixAlert, UsbConsole>;
