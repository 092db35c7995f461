//! The shared signal line and the clock used to time it.
//!
//! Both roles talk over one half-duplex wire. Whoever owns the current
//! protocol turn drives it; the other side listens. [`SignalLine`] extends the
//! `embedded-hal` pin traits with explicit direction switching, and
//! [`MicrosClock`] supplies the wrapping microsecond counter that
//! [`PulseClock`] uses to measure the time between transitions.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::{LinkError, Result};

/// Logic level on the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Level {
    /// Line pulled or driven low.
    Low,
    /// Line pulled or driven high.
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl core::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// A bidirectional GPIO line.
///
/// The line is read as an input while the peer owns the turn and switched to
/// output while this side drives it. Switching back to input releases the
/// line to whatever the peer (or the pull resistor) holds it at.
pub trait SignalLine: InputPin + OutputPin {
    /// Release the line and sample it.
    fn set_as_input(&mut self) -> core::result::Result<(), Self::Error>;
    /// Take the line over and drive the last written level.
    fn set_as_output(&mut self) -> core::result::Result<(), Self::Error>;
}

/// A free running microsecond counter.
///
/// The value is allowed to wrap; durations are always computed with
/// `wrapping_sub`.
pub trait MicrosClock {
    /// Current time in microseconds.
    fn now_us(&mut self) -> u32;
}

/// One level held between two transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Pulse {
    /// Level the line arrived at when the pulse ended.
    pub level: Level,
    /// How long the previous level was held.
    pub duration_us: u32,
}

/// Reads the line, mapping HAL errors.
pub(crate) fn read_level<L: SignalLine>(line: &mut L) -> Result<Level> {
    line.is_high().map(Level::from).map_err(|_| LinkError::Pin)
}

/// Drives the line to `level`.
pub(crate) fn write_level<L: SignalLine>(line: &mut L, level: Level) -> Result<()> {
    match level {
        Level::High => line.set_high(),
        Level::Low => line.set_low(),
    }
    .map_err(|_| LinkError::Pin)
}

/// Measures durations between level transitions on the line.
///
/// Keeps the level last seen and the time it was first seen. Every wait is
/// bounded: if the line does not move within the given budget the wait
/// returns [`LinkError::Timeout`] instead of spinning forever.
#[derive(Debug, Clone, Copy)]
pub struct PulseClock {
    last_level: Level,
    last_edge_us: u32,
}

impl PulseClock {
    /// Starts measuring from `level`, first seen at `now_us`.
    pub fn new(level: Level, now_us: u32) -> Self {
        Self {
            last_level: level,
            last_edge_us: now_us,
        }
    }

    /// Level seen at the last transition.
    pub fn level(&self) -> Level {
        self.last_level
    }

    /// Restarts the measurement from a known level.
    pub fn rebase(&mut self, level: Level, now_us: u32) {
        self.last_level = level;
        self.last_edge_us = now_us;
    }

    /// Spins until the line leaves the last seen level.
    ///
    /// Returns the pulse that just ended: the new level, and how long the old
    /// one was held.
    pub fn wait_change<L, C>(&mut self, line: &mut L, clock: &mut C, max_wait_us: u32) -> Result<Pulse>
    where
        L: SignalLine,
        C: MicrosClock,
    {
        let started = clock.now_us();
        loop {
            let level = read_level(line)?;
            let now = clock.now_us();
            if level != self.last_level {
                let pulse = Pulse {
                    level,
                    duration_us: now.wrapping_sub(self.last_edge_us),
                };
                self.rebase(level, now);
                return Ok(pulse);
            }
            let waited_us = now.wrapping_sub(started);
            if waited_us > max_wait_us {
                return Err(LinkError::Timeout { waited_us });
            }
        }
    }

    /// Spins until the line reads `level`, returning at once if it already does.
    pub fn wait_for<L, C>(&mut self, line: &mut L, clock: &mut C, level: Level, max_wait_us: u32) -> Result<()>
    where
        L: SignalLine,
        C: MicrosClock,
    {
        if self.last_level == level && read_level(line)? == level {
            return Ok(());
        }
        while self.wait_change(line, clock, max_wait_us)?.level != level {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimWire, Script};

    #[test]
    fn test_measures_low_phase() {
        let script = Script::new(Level::High).hold(50).level(Level::Low, 120).level(Level::High, 10);
        let wire = SimWire::from_script(script);
        let (mut line, mut clock) = (wire.line(), wire.clock());

        let mut pulse = PulseClock::new(Level::High, clock.now_us());
        let fall = pulse.wait_change(&mut line, &mut clock, 1_000).unwrap();
        assert_eq!(fall.level, Level::Low);
        let rise = pulse.wait_change(&mut line, &mut clock, 1_000).unwrap();
        assert_eq!(rise.level, Level::High);
        assert!((119..=121).contains(&rise.duration_us), "{}", rise.duration_us);
    }

    #[test]
    fn test_quiet_line_times_out() {
        let wire = SimWire::from_script(Script::new(Level::High));
        let (mut line, mut clock) = (wire.line(), wire.clock());

        let mut pulse = PulseClock::new(Level::High, clock.now_us());
        let err = pulse.wait_change(&mut line, &mut clock, 500).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_wait_for_returns_immediately_on_matching_level() {
        let wire = SimWire::from_script(Script::new(Level::High).hold(1_000));
        let (mut line, mut clock) = (wire.line(), wire.clock());

        let mut pulse = PulseClock::new(Level::High, clock.now_us());
        pulse.wait_for(&mut line, &mut clock, Level::High, 10).unwrap();
        assert!(clock.now_us() < 10);
    }
}
