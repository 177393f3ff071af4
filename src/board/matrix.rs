// SPDX-License-Identifier: Apache-2.0

//! 5x5 WS2812 matrix on GPIO7, driven by PIO0 state machine 0.
//!
//! The trend and alert slots both paint the matrix, so it lives in [`MATRIX`] and is reached
//! through the [`MatrixTrend`] and [`MatrixAlert`] handles.

use core::cell::RefCell;

use critical_section::Mutex;
use rp2040_hal::{
    gpio::{bank0::Gpio7, FunctionPio0, Pin, PullDown},
    pac::PIO0,
    pio::SM0,
};
use smart_leds::{brightness, SmartLedsWrite};
use ws2812_pio::Ws2812Direct;

use crate::{
    components::{AlertSink, IndicatorSink},
    config::MATRIX_BRIGHTNESS,
    matrix::MatrixLayers,
    trend::Trend,
};

/// Data line of the matrix
pub type MatrixPin = Pin<Gpio7, FunctionPio0, PullDown>;

/// WS2812 driver on PIO0/SM0
pub type MatrixDriver = Ws2812Direct<PIO0, SM0, MatrixPin>;

/// Driver and the colour it currently shows
pub struct LedMatrix {
    /// PIO-backed WS2812 output
    driver: MatrixDriver,
    /// Trend colour and alert overlay
    layers: MatrixLayers,
}

impl LedMatrix {
    /// Push the current layers to the pixels
    fn refresh(&mut self) {
        let frame = brightness(self.layers.frame(), MATRIX_BRIGHTNESS);
        if self.driver.write(frame).is_err() {
            warn!("LED matrix write failed");
        }
    }
}

/// LED matrix for access in interrupts
pub static MATRIX: Mutex<RefCell<Option<LedMatrix>>> = Mutex::new(RefCell::new(None));

/// Blank the matrix and store it in [`MATRIX`]
pub fn install(driver: MatrixDriver) {
    let mut matrix = LedMatrix {
        driver,
        layers: MatrixLayers::new(),
    };
    matrix.refresh();
    debug!("critical_section: install LED matrix");
    critical_section::with(|cs| MATRIX.replace(cs, Some(matrix)));
}

/// Apply `update` to the installed matrix and redraw it
fn with_matrix(update: impl FnOnce(&mut MatrixLayers)) {
    critical_section::with(|cs| {
        if let Some(matrix) = MATRIX.borrow_ref_mut(cs).as_mut() {
            update(&mut matrix.layers);
            matrix.refresh();
        }
    });
}

/// Trend colour on the matrix
pub struct MatrixTrend;

impl IndicatorSink for MatrixTrend {
    fn show_trend(&mut self, trend: Trend) {
        with_matrix(|layers| layers.set_trend(trend));
    }
}

/// White alert blink on the matrix
pub struct MatrixAlert;

impl AlertSink for MatrixAlert {
    fn set(&mut self, lit: bool) {
        with_matrix(|layers| layers.set_alert(lit));
    }
}
