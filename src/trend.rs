// SPDX-License-Identifier: Apache-2.0

//! Short-term temperature trend classification

/// Direction of the temperature between two consecutive classifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trend {
    /// Warmer than the previous reading by more than the tolerance
    Rising,
    /// Colder than the previous reading by more than the tolerance
    Falling,
    /// Within the tolerance of the previous reading
    Stable,
    /// No previous reading to compare against
    Unknown,
}

impl Trend {
    /// Short label for the console and the display
    pub fn label(self) -> &'static str {
        match self {
            Trend::Rising => "rising",
            Trend::Falling => "falling",
            Trend::Stable => "stable",
            Trend::Unknown => "unknown",
        }
    }

    /// Whether this is an actual classification rather than [`Trend::Unknown`]
    pub fn is_known(self) -> bool {
        self != Trend::Unknown
    }
}

/// Classifies each reading against the one before it
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    /// Differences up to this magnitude count as stable, in °C
    tolerance: f32,
    /// Reading passed to the previous [`classify`](Self::classify) call
    previous: Option<f32>,
}

impl TrendAnalyzer {
    /// Create an analyzer with no history
    pub const fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            previous: None,
        }
    }

    /// Classify `current` against the previous reading, then remember it.
    ///
    /// The first call always yields [`Trend::Unknown`].
    pub fn classify(&mut self, current: f32) -> Trend {
        let trend = match self.previous {
            None => Trend::Unknown,
            Some(previous) => {
                let delta = current - previous;
                if delta.abs() <= self.tolerance {
                    Trend::Stable
                } else if delta > 0.0 {
                    Trend::Rising
                } else {
                    Trend::Falling
                }
            }
        };
        self.previous = Some(current);
        trend
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
