//! Tunable link timing.
//!
//! All durations are in microseconds. The defaults match the waveform a
//! stock player produces; boards with slow pin access may need to widen the
//! reset window or lower the short pulse.

/// Timing configuration shared by the decoder, the encoder and both sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Timing {
    /// Shortest low phase recognised as a reset.
    pub reset_low_min_us: u32,
    /// Longest low phase recognised as a reset.
    pub reset_low_max_us: u32,
    /// Low phases shorter than this decode as `1`, others as `0`.
    pub pulse_on_threshold_us: u32,
    /// Short unit `S` of the bit waveform.
    pub pulse_short_us: u32,
    /// Long unit `L` of the bit waveform.
    pub pulse_long_us: u32,
    /// Low phase of the transmitted reset.
    pub reset_low_us: u32,
    /// High phase following the transmitted reset.
    pub reset_high_us: u32,
    /// Idle time after every transmitted byte.
    pub inter_byte_delay_us: u32,
    /// Time the host waits after releasing the line before it starts the
    /// long sampling wait of a read-back slot.
    pub readback_settle_us: u32,
    /// Host keep-alive cadence.
    pub keepalive_interval_us: u32,
    /// Longest silence inside a packet before the packet is considered over.
    pub end_msg_timeout_us: u32,
    /// Longest wait for any edge while waiting for a reset.
    pub max_wait_us: u32,
    /// Time the host holds the line high after taking it over.
    pub line_settle_us: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            reset_low_min_us: 700,
            reset_low_max_us: 1_300,
            pulse_on_threshold_us: 100,
            pulse_short_us: 18,
            pulse_long_us: 220,
            reset_low_us: 1_100,
            reset_high_us: 1_000 + 18,
            inter_byte_delay_us: 80,
            readback_settle_us: 20,
            keepalive_interval_us: 32_000,
            end_msg_timeout_us: 6_500,
            max_wait_us: 100_000,
            line_settle_us: 8_000,
        }
    }
}

impl Timing {
    /// Returns `true` if a low phase of `duration_us` falls in the reset window.
    ///
    /// Both bounds are inclusive.
    pub fn is_reset(&self, duration_us: u32) -> bool {
        (self.reset_low_min_us..=self.reset_low_max_us).contains(&duration_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_window_is_inclusive() {
        let timing = Timing::default();
        assert!(!timing.is_reset(699));
        assert!(timing.is_reset(700));
        assert!(timing.is_reset(1_100));
        assert!(timing.is_reset(1_300));
        assert!(!timing.is_reset(1_301));
    }

    #[test]
    fn test_transmitted_reset_lands_inside_window() {
        let timing = Timing::default();
        assert!(timing.is_reset(timing.reset_low_us));
        assert!(timing.pulse_short_us < timing.pulse_on_threshold_us);
        assert!(timing.pulse_long_us >= timing.pulse_on_threshold_us);
    }
}
