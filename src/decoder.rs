//! Pulse classification.
//!
//! A bit is carried by the width of the low phase that ends at a rising edge:
//! a short low is a `1`, a long low is a `0`, and a low held inside the reset
//! window re-synchronises both parties to the start of a new packet. Only
//! rising edges produce symbols. Falling edges are timing references.
//!
//! The decoder needs only relative durations, so it tolerates drift between
//! the two parties' clocks.

use crate::config::Timing;
use crate::line::{Level, Pulse};

/// What a single pulse means on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Symbol {
    /// Short low phase.
    One,
    /// Long low phase.
    Zero,
    /// Low phase inside the reset window.
    Reset,
    /// Falling edge. Carries no bit, only restarts the timing.
    Edge,
}

impl Symbol {
    /// The bit value of a data symbol.
    pub fn bit(self) -> Option<bool> {
        match self {
            Symbol::One => Some(true),
            Symbol::Zero => Some(false),
            Symbol::Reset | Symbol::Edge => None,
        }
    }
}

/// Classifies pulses against the configured thresholds.
#[derive(Debug, Clone, Copy)]
pub struct BitDecoder {
    reset_low_min_us: u32,
    reset_low_max_us: u32,
    pulse_on_threshold_us: u32,
}

impl BitDecoder {
    /// Creates a decoder from the link timing.
    pub fn new(timing: &Timing) -> Self {
        Self {
            reset_low_min_us: timing.reset_low_min_us,
            reset_low_max_us: timing.reset_low_max_us,
            pulse_on_threshold_us: timing.pulse_on_threshold_us,
        }
    }

    /// Classifies the pulse that just ended.
    ///
    /// A reset takes priority over bit accumulation regardless of how much of
    /// the current byte has been gathered.
    pub fn classify(&self, pulse: Pulse) -> Symbol {
        match pulse.level {
            Level::Low => Symbol::Edge,
            Level::High
                if (self.reset_low_min_us..=self.reset_low_max_us)
                    .contains(&pulse.duration_us) =>
            {
                Symbol::Reset
            }
            Level::High if pulse.duration_us < self.pulse_on_threshold_us => Symbol::One,
            Level::High => Symbol::Zero,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(duration_us: u32) -> Pulse {
        Pulse {
            level: Level::High,
            duration_us,
        }
    }

    #[test]
    fn test_threshold_boundary() {
        let timing = Timing::default();
        let decoder = BitDecoder::new(&timing);
        assert_eq!(
            decoder.classify(rising(timing.pulse_on_threshold_us - 1)),
            Symbol::One
        );
        assert_eq!(
            decoder.classify(rising(timing.pulse_on_threshold_us)),
            Symbol::Zero
        );
    }

    #[test]
    fn test_reset_window() {
        let decoder = BitDecoder::new(&Timing::default());
        assert_eq!(decoder.classify(rising(699)), Symbol::Zero);
        assert_eq!(decoder.classify(rising(700)), Symbol::Reset);
        assert_eq!(decoder.classify(rising(1_300)), Symbol::Reset);
        assert_eq!(decoder.classify(rising(1_301)), Symbol::Zero);
    }

    #[test]
    fn test_falling_edges_never_produce_bits() {
        let decoder = BitDecoder::new(&Timing::default());
        for duration_us in [0, 18, 220, 1_100, 40_000] {
            let symbol = decoder.classify(Pulse {
                level: Level::Low,
                duration_us,
            });
            assert_eq!(symbol, Symbol::Edge);
            assert_eq!(symbol.bit(), None);
        }
    }

    #[test]
    fn test_encoder_waveforms_decode() {
        let timing = Timing::default();
        let decoder = BitDecoder::new(&timing);
        assert_eq!(decoder.classify(rising(timing.pulse_short_us)), Symbol::One);
        assert_eq!(decoder.classify(rising(timing.pulse_long_us)), Symbol::Zero);
        assert_eq!(decoder.classify(rising(timing.reset_low_us)), Symbol::Reset);
    }
}
