// SPDX-License-Identifier: Apache-2.0

//! Interfaces of the presentation components driven by the scheduler.
//!
//! None of these may block for long: every call happens inside the timer tick.

use crate::trend::Trend;

/// Text display showing the latest reading
pub trait DisplaySink {
    /// Redraw with a new temperature and trend
    fn render(&mut self, celsius: f32, trend: Trend);
}

/// Light whose colour follows the trend
pub trait IndicatorSink {
    /// Show `trend`
    fn show_trend(&mut self, trend: Trend);
}

/// Show the trend on two lights at once
impl<A: IndicatorSink, B: IndicatorSink> IndicatorSink for (A, B) {
    fn show_trend(&mut self, trend: Trend) {
        self.0.show_trend(trend);
        self.1.show_trend(trend);
    }
}

/// Low-temperature alert light
pub trait AlertSink {
    /// Turn the alert on or off. Blinking is done by the caller toggling this.
    fn set(&mut self, lit: bool);
}

/// Line-oriented text output
pub trait Console {
    /// Write `line` followed by a line break. Output may be dropped if the host is not reading.
    fn write_line(&mut self, line: &str);
}

/// Link carrying the [`Console`]
pub trait Transport {
    /// Whether a host is attached and listening
    fn is_connected(&mut self) -> bool;
}

/// Everything the scheduler presents to
pub struct Sinks<D, I, A, W> {
    /// OLED or other display
    pub display: D,
    /// Trend light
    pub indicator: I,
    /// Alert light
    pub alert: A,
    /// Console output
    pub console: W,
}

impl<D, I, A, W> Sinks<D, I, A, W>
where
    D: DisplaySink,
    I: IndicatorSink,
    A: AlertSink,
    W: Console,
{
    /// Bundle the four sinks
    pub fn new(display: D, indicator: I, alert: A, console: W) -> Self {
        Self {
            display,
            indicator,
            alert,
            console,
        }
    }
}
