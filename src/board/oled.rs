// SPDX-License-Identifier: Apache-2.0

//! SSD1306 128x64 OLED on I2C1

use core::fmt::Write;

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use heapless::String;
use rp2040_hal::{
    gpio::{
        bank0::{Gpio14, Gpio15},
        FunctionI2C, Pin, PullUp,
    },
    pac, I2C,
};
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use crate::{components::DisplaySink, trend::Trend};

/// I2C1 on GPIO14 (SDA) and GPIO15 (SCL)
pub type OledI2c = I2C<
    pac::I2C1,
    (
        Pin<Gpio14, FunctionI2C, PullUp>,
        Pin<Gpio15, FunctionI2C, PullUp>,
    ),
>;

/// Buffered SSD1306 driver
type Driver =
    Ssd1306<I2CInterface<OledI2c>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Two text lines: temperature and trend
pub struct OledDisplay {
    /// Framebuffer and bus
    driver: Driver,
    /// Text style for both lines
    style: MonoTextStyle<'static, BinaryColor>,
}

impl OledDisplay {
    /// Initialise the panel and show a placeholder until the first reading
    pub fn init(i2c: OledI2c) -> Self {
        let mut driver = Ssd1306::new(
            I2CDisplayInterface::new(i2c),
            DisplaySize128x64,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();
        if driver.init().is_err() {
            warn!("OLED did not acknowledge initialisation");
        }

        let mut display = Self {
            driver,
            style: MonoTextStyle::new(&FONT_6X10, BinaryColor::On),
        };
        display.draw_lines("TempCycleDMA", "Waiting for data");
        display
    }

    /// Replace the screen contents with two lines of text
    fn draw_lines(&mut self, first: &str, second: &str) {
        self.driver.clear_buffer();
        Text::with_baseline(first, Point::new(0, 16), self.style, Baseline::Top)
            .draw(&mut self.driver)
            .ok();
        Text::with_baseline(second, Point::new(0, 32), self.style, Baseline::Top)
            .draw(&mut self.driver)
            .ok();
        if self.driver.flush().is_err() {
            warn!("OLED flush failed");
        }
    }
}

impl DisplaySink for OledDisplay {
    fn render(&mut self, celsius: f32, trend: Trend) {
        let mut temperature: String<24> = String::new();
        write!(temperature, "Temp: {:.2} C", celsius).ok();
        let mut direction: String<24> = String::new();
        // An unknown trend is shown as a placeholder, never as a direction
        let label = if trend.is_known() { trend.label() } else { "--" };
        write!(direction, "Trend: {}", label).ok();
        self.draw_lines(&temperature, &direction);
    }
}
