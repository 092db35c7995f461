//! Expectation builders for driving the link against `embedded-hal-mock` pins.

use std::vec::Vec;

use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as PinState, Transaction as PinTransaction,
};

use crate::line::{MicrosClock, SignalLine};

impl SignalLine for PinMock {
    fn set_as_input(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_as_output(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub(crate) fn expect_one(expected: &mut Vec<PinTransaction>) {
    expected.extend([
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ]);
}

pub(crate) fn expect_zero(expected: &mut Vec<PinTransaction>) {
    expected.extend([
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ]);
}

pub(crate) fn expect_reset(expected: &mut Vec<PinTransaction>) {
    expect_zero(expected);
}

pub(crate) fn expect_send_byte(expected: &mut Vec<PinTransaction>, byte: u8) {
    for i in 0..8 {
        if byte & (1 << i) != 0 {
            expect_one(expected);
        } else {
            expect_zero(expected);
        }
    }
}

/// The host clocking eight slots while the peer drives `value`.
pub(crate) fn expect_read_byte(expected: &mut Vec<PinTransaction>, value: u8) {
    for i in 0..8 {
        if value & (1 << i) != 0 {
            expected.extend([
                PinTransaction::get(PinState::High),
                PinTransaction::set(PinState::Low),
                PinTransaction::set(PinState::High),
            ]);
        } else {
            expected.extend([
                PinTransaction::get(PinState::Low),
                PinTransaction::set(PinState::High),
            ]);
        }
    }
}

/// A clock that moves forward by a fixed step every time it is read.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepClock {
    pub(crate) now: u32,
    pub(crate) step: u32,
}

impl StepClock {
    pub(crate) fn new(step: u32) -> Self {
        Self { now: 0, step }
    }
}

impl MicrosClock for StepClock {
    fn now_us(&mut self) -> u32 {
        let now = self.now;
        self.now = self.now.wrapping_add(self.step);
        now
    }
}
