// SPDX-License-Identifier: Apache-2.0

//! Colour of the LED matrix, shared by the trend indicator and the alert.
//!
//! Both slots paint the same pixels. The alert is an overlay: while lit the whole matrix is
//! white, otherwise it shows the trend colour underneath.

use core::iter;

use smart_leds::RGB8;

use crate::{config::MATRIX_PIXELS, trend::Trend};

/// Full white, used by the alert overlay
pub const ALERT_WHITE: RGB8 = RGB8::new(255, 255, 255);

/// All pixels off
pub const DARK: RGB8 = RGB8::new(0, 0, 0);

/// Matrix colour for a trend. [`Trend::Unknown`] leaves the matrix dark.
pub fn trend_colour(trend: Trend) -> RGB8 {
    match trend {
        Trend::Rising => RGB8::new(255, 0, 0),
        Trend::Falling => RGB8::new(0, 0, 255),
        Trend::Stable => RGB8::new(0, 255, 0),
        Trend::Unknown => DARK,
    }
}

/// Trend and alert layers of the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixLayers {
    /// Bottom layer
    trend: RGB8,
    /// White overlay
    alert_lit: bool,
}

impl MatrixLayers {
    /// Dark matrix, alert off
    pub const fn new() -> Self {
        Self {
            trend: DARK,
            alert_lit: false,
        }
    }

    /// Repaint the trend layer
    pub fn set_trend(&mut self, trend: Trend) {
        self.trend = trend_colour(trend);
    }

    /// Raise or drop the alert overlay
    pub fn set_alert(&mut self, lit: bool) {
        self.alert_lit = lit;
    }

    /// Colour every pixel currently shows
    pub fn colour(&self) -> RGB8 {
        if self.alert_lit {
            ALERT_WHITE
        } else {
            self.trend
        }
    }

    /// One colour per pixel, in wiring order
    pub fn frame(&self) -> impl Iterator<Item = RGB8> {
        iter::repeat(self.colour()).take(MATRIX_PIXELS)
    }
}

impl Default for MatrixLayers {
    fn default() -> Self {
        Self::new()
    }
}
