// SPDX-License-Identifier: Apache-2.0

//! RGB trend LED

use embedded_hal::digital::{OutputPin, PinState};
use rp2040_hal::gpio::{
    bank0::{Gpio11, Gpio12, Gpio13},
    FunctionNull, FunctionSio, Pin, PullDown, SioOutput,
};

use crate::{components::IndicatorSink, trend::Trend};

/// Push-pull output pin
type OutputLed<I> = Pin<I, FunctionSio<SioOutput>, PullDown>;

/// Common-cathode RGB LED showing the trend
pub struct TrendLed {
    /// Lit while rising
    red: OutputLed<Gpio13>,
    /// Lit while stable
    green: OutputLed<Gpio11>,
    /// Lit while falling
    blue: OutputLed<Gpio12>,
}

impl TrendLed {
    /// Configure the three pins as outputs, all off
    pub fn init(
        red: Pin<Gpio13, FunctionNull, PullDown>,
        green: Pin<Gpio11, FunctionNull, PullDown>,
        blue: Pin<Gpio12, FunctionNull, PullDown>,
    ) -> Self {
        Self {
            red: red.into_push_pull_output_in_state(PinState::Low),
            green: green.into_push_pull_output_in_state(PinState::Low),
            blue: blue.into_push_pull_output_in_state(PinState::Low),
        }
    }
}

impl IndicatorSink for TrendLed {
    fn show_trend(&mut self, trend: Trend) {
        let (red, green, blue) = match trend {
            Trend::Rising => (PinState::High, PinState::Low, PinState::Low),
            Trend::Stable => (PinState::Low, PinState::High, PinState::Low),
            Trend::Falling => (PinState::Low, PinState::Low, PinState::High),
            // Nothing to show before a second reading
            Trend::Unknown => (PinState::Low, PinState::Low, PinState::Low),
        };
        self.red.set_state(red).ok();
        self.green.set_state(green).ok();
        self.blue.set_state(blue).ok();
    }
}
