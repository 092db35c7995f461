//! Pulse-width bit encoding for the transmit path.
//!
//! Every bit starts with a short unit `S` at the idle (high) level. What
//! follows decides the value:
//!
//! ```text
//! 1:  S high | L high | S low | high      (short low phase)
//! 0:  S high | L low  | high              (long low phase)
//! ```
//!
//! Bytes go out LSB first followed by an inter-byte idle. A packet is
//! preceded by a reset (`~1100 us` low, `~1018 us` high) and ends with the
//! XOR parity of its payload.
//!
//! The encoder also implements the host half of the tri-state read-back:
//! the host clocks each bit slot, releases the line, and samples what the
//! remote drives onto it.

use embedded_hal::delay::DelayNs;

use crate::config::Timing;
use crate::error::{LinkError, Result};
use crate::line::{Level, SignalLine, write_level};
use crate::parity::parity;

/// Emits precisely timed waveforms onto a [`SignalLine`].
#[derive(Debug, Clone, Copy)]
pub struct PulseEncoder {
    short_us: u32,
    long_us: u32,
    reset_low_us: u32,
    reset_high_us: u32,
    inter_byte_us: u32,
    settle_us: u32,
}

impl PulseEncoder {
    /// Creates an encoder from the link timing.
    pub fn new(timing: &Timing) -> Self {
        Self {
            short_us: timing.pulse_short_us,
            long_us: timing.pulse_long_us,
            reset_low_us: timing.reset_low_us,
            reset_high_us: timing.reset_high_us,
            inter_byte_us: timing.inter_byte_delay_us,
            settle_us: timing.readback_settle_us.min(timing.pulse_long_us),
        }
    }

    /// Drives the reset preamble that starts every packet.
    pub fn send_reset<L: SignalLine, D: DelayNs>(&self, line: &mut L, delay: &mut D) -> Result<()> {
        write_level(line, Level::Low)?;
        delay.delay_us(self.reset_low_us);
        write_level(line, Level::High)?;
        delay.delay_us(self.reset_high_us);
        Ok(())
    }

    /// Drives a `1`: long high bracketed by short transitions.
    pub fn send_one<L: SignalLine, D: DelayNs>(&self, line: &mut L, delay: &mut D) -> Result<()> {
        delay.delay_us(self.short_us);
        write_level(line, Level::High)?;
        delay.delay_us(self.long_us);
        write_level(line, Level::Low)?;
        delay.delay_us(self.short_us);
        write_level(line, Level::High)
    }

    /// Drives a `0`: the long phase stays low.
    ///
    /// A lone `0` is also the sync bit after a reset and the clock pulse
    /// the host emits before each read-back byte.
    pub fn send_zero<L: SignalLine, D: DelayNs>(&self, line: &mut L, delay: &mut D) -> Result<()> {
        delay.delay_us(self.short_us);
        write_level(line, Level::Low)?;
        delay.delay_us(self.long_us);
        write_level(line, Level::High)
    }

    /// Drives one byte LSB first, then idles for the inter-byte delay.
    pub fn send_byte<L: SignalLine, D: DelayNs>(&self, line: &mut L, delay: &mut D, byte: u8) -> Result<()> {
        for i in 0..8 {
            if byte & (1 << i) != 0 {
                self.send_one(line, delay)?;
            } else {
                self.send_zero(line, delay)?;
            }
        }
        delay.delay_us(self.inter_byte_us);
        Ok(())
    }

    /// Drives `data` followed by its parity byte.
    pub fn send_frame<L: SignalLine, D: DelayNs>(&self, line: &mut L, delay: &mut D, data: &[u8]) -> Result<()> {
        for &byte in data {
            self.send_byte(line, delay, byte)?;
        }
        self.send_byte(line, delay, parity(data))
    }

    /// Clocks eight bit slots and samples what the peer drives onto the line.
    ///
    /// For each slot the line is released after `S`, sampled `L` later and
    /// taken back. A high sample is acknowledged with a short low pulse so
    /// the peer sees its own bit end.
    pub fn read_byte<L: SignalLine, D: DelayNs>(&self, line: &mut L, delay: &mut D) -> Result<u8> {
        let mut data = 0;
        for i in 0..8 {
            delay.delay_us(self.short_us);
            line.set_as_input().map_err(|_| LinkError::Pin)?;
            delay.delay_us(self.settle_us);
            delay.delay_us(self.long_us - self.settle_us);
            let high = line.is_high().map_err(|_| LinkError::Pin)?;

            if high {
                line.set_as_output().map_err(|_| LinkError::Pin)?;
                write_level(line, Level::Low)?;
                delay.delay_us(self.short_us);
                write_level(line, Level::High)?;
                data |= 1 << i;
            } else {
                delay.delay_us(self.short_us);
                line.set_as_output().map_err(|_| LinkError::Pin)?;
                write_level(line, Level::High)?;
            }
        }
        Ok(data)
    }

    /// Asserts a bit onto a slot the peer is clocking.
    ///
    /// Used by the listening side: the line is driven high for the long unit
    /// and released again.
    pub fn assert_slot<L: SignalLine, D: DelayNs>(&self, line: &mut L, delay: &mut D) -> Result<()> {
        line.set_as_output().map_err(|_| LinkError::Pin)?;
        write_level(line, Level::High)?;
        delay.delay_us(self.long_us);
        line.set_as_input().map_err(|_| LinkError::Pin)
    }

    /// Duration of the long unit.
    pub fn long_us(&self) -> u32 {
        self.long_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        expect_one, expect_read_byte, expect_reset, expect_send_byte, expect_zero,
    };
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::Mock as PinMock;
    use std::vec::Vec;

    #[test]
    fn test_bit_waveforms() {
        let mut expected = Vec::new();
        expect_one(&mut expected);
        expect_zero(&mut expected);
        assert_eq!(expected.len(), 5);

        let mut line = PinMock::new(&expected);
        let encoder = PulseEncoder::new(&Timing::default());
        let mut delay = NoopDelay::new();
        encoder.send_one(&mut line, &mut delay).unwrap();
        encoder.send_zero(&mut line, &mut delay).unwrap();
        line.done();
    }

    #[test]
    fn test_frame_ends_with_parity() {
        let data = [0xA0, 0x00, 0x00, 0x12, 0, 0, 0, 0, 0, 0];
        let mut expected = Vec::new();
        expect_reset(&mut expected);
        for byte in data {
            expect_send_byte(&mut expected, byte);
        }
        expect_send_byte(&mut expected, 0xB2);

        let mut line = PinMock::new(&expected);
        let encoder = PulseEncoder::new(&Timing::default());
        let mut delay = NoopDelay::new();
        encoder.send_reset(&mut line, &mut delay).unwrap();
        encoder.send_frame(&mut line, &mut delay, &data).unwrap();
        line.done();
    }

    #[test]
    fn test_read_byte_samples_lsb_first() {
        let mut expected = Vec::new();
        expect_read_byte(&mut expected, 0x90);

        let mut line = PinMock::new(&expected);
        let encoder = PulseEncoder::new(&Timing::default());
        let mut delay = NoopDelay::new();
        assert_eq!(encoder.read_byte(&mut line, &mut delay).unwrap(), 0x90);
        line.done();
    }
}
