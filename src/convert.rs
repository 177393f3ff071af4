// SPDX-License-Identifier: Apache-2.0

//! Conversion of raw ADC codes from the internal temperature sensor.

/// ADC reference voltage
const VREF: f32 = 3.3;
/// Volts per ADC code at 12-bit resolution
const VOLTS_PER_CODE: f32 = VREF / (1 << 12) as f32;
/// Sensor voltage at 27 °C
const V_27C: f32 = 0.706;
/// Sensor slope, in V/°C. The voltage falls as the die warms up.
const SLOPE: f32 = 0.001721;

/// Convert a 12-bit reading of ADC input 4 into degrees Celsius.
///
/// T = 27 - (V - 0.706) / 0.001721, from section 4.9.5 of the RP2040 datasheet
pub fn celsius(raw: u16) -> f32 {
    let voltage = raw as f32 * VOLTS_PER_CODE;
    27.0 - (voltage - V_27C) / SLOPE
}

/// Sum of [`celsius`] over every code in a block
pub fn block_sum(block: &[u16]) -> f32 {
    block.iter().map(|&raw| celsius(raw)).sum()
}
