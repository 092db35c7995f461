//! A simulated signal line for host-side testing.
//!
//! [`SimWire`] models one end of the shared wire. The far end is a scripted
//! timeline of `(time_us, level)` events built with [`Script`]. Everything
//! the local side drives is recorded so it can be inspected, or replayed as
//! the script of another wire to connect two sessions back to back.
//!
//! Time is virtual. Each pin read costs [`SimWire::read_cost_us`], delays
//! advance the clock by their duration, and nothing else moves it, so tests
//! are deterministic and run instantly.

use core::convert::Infallible;
use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::config::Timing;
use crate::line::{Level, MicrosClock, SignalLine};
use crate::parity::parity;

/// A timeline of level changes driven by the far end of the wire.
#[derive(Debug, Clone)]
pub struct Script {
    initial: Level,
    level: Level,
    cursor: u32,
    events: Vec<(u32, Level)>,
    timing: Timing,
}

impl Script {
    /// Starts an empty timeline at `initial`, using the default timing.
    pub fn new(initial: Level) -> Self {
        Self {
            initial,
            level: initial,
            cursor: 0,
            events: Vec::new(),
            timing: Timing::default(),
        }
    }

    /// Uses `timing` for the waveform helpers that follow.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Time at the end of the timeline.
    pub fn now(&self) -> u32 {
        self.cursor
    }

    /// Keeps the current level for `us`.
    pub fn hold(mut self, us: u32) -> Self {
        self.cursor += us;
        self
    }

    /// Switches to `level` now without advancing time.
    pub fn set(mut self, level: Level) -> Self {
        if level != self.level {
            self.events.push((self.cursor, level));
            self.level = level;
        }
        self
    }

    /// Switches to `level` and holds it for `us`.
    pub fn level(self, level: Level, us: u32) -> Self {
        self.set(level).hold(us)
    }

    /// Reset preamble.
    pub fn reset(self) -> Self {
        let (low, high) = (self.timing.reset_low_us, self.timing.reset_high_us);
        self.level(Level::Low, low).level(Level::High, high)
    }

    /// A `1` bit as the host encodes it.
    pub fn one(self) -> Self {
        let (short, long) = (self.timing.pulse_short_us, self.timing.pulse_long_us);
        self.hold(short)
            .level(Level::High, long)
            .level(Level::Low, short)
            .set(Level::High)
    }

    /// A `0` bit as the host encodes it. Also the sync bit and the read-back clock.
    pub fn zero(self) -> Self {
        let (short, long) = (self.timing.pulse_short_us, self.timing.pulse_long_us);
        self.hold(short).level(Level::Low, long).set(Level::High)
    }

    /// A byte LSB first followed by the inter-byte gap.
    pub fn byte(self, byte: u8) -> Self {
        let gap = self.timing.inter_byte_delay_us;
        (0..8)
            .fold(self, |script, i| {
                if byte & (1 << i) != 0 {
                    script.one()
                } else {
                    script.zero()
                }
            })
            .hold(gap)
    }

    /// `data` followed by its parity byte.
    pub fn frame(self, data: &[u8]) -> Self {
        let trailer = parity(data);
        data.iter()
            .fold(self, |script, &byte| script.byte(byte))
            .byte(trailer)
    }

    /// One read-back slot as the listening side sees it.
    ///
    /// The host releases the line after `S`, samples it `L` later and drives
    /// it high again after another `S`. Whatever the listener asserts in
    /// between is its own drive and does not show up here.
    pub fn read_slot(self) -> Self {
        let (short, long) = (self.timing.pulse_short_us, self.timing.pulse_long_us);
        self.hold(short).level(Level::Low, long + short).set(Level::High)
    }

    /// Eight read-back slots.
    pub fn read_byte(self) -> Self {
        (0..8).fold(self, |script, _| script.read_slot())
    }

    /// The clock pulse the host emits before each read-back byte.
    pub fn clock_pulse(self) -> Self {
        let long = self.timing.pulse_long_us;
        self.hold(long).zero()
    }

    /// A full host cycle up to and including the header byte.
    pub fn header(self, flags: u8) -> Self {
        self.reset().zero().read_byte().byte(flags)
    }
}

#[derive(Debug)]
struct WireState {
    now: u32,
    read_cost_us: u32,
    initial: Level,
    peer: Vec<(u32, Level)>,
    next_event: usize,
    output: bool,
    latch: Level,
    trace: Vec<(u32, Level)>,
}

impl WireState {
    fn peer_level(&mut self) -> Level {
        while self
            .peer
            .get(self.next_event)
            .is_some_and(|&(at, _)| at <= self.now)
        {
            self.next_event += 1;
        }
        match self.next_event {
            0 => self.initial,
            n => self.peer[n - 1].1,
        }
    }

    fn record(&mut self, level: Level) {
        match self.trace.last_mut() {
            Some(&mut (_, last)) if last == level => {}
            Some(entry) if entry.0 == self.now => entry.1 = level,
            _ => self.trace.push((self.now, level)),
        }
    }
}

/// One end of a simulated wire.
///
/// Cloning shares the wire; the pin, clock and delay handles all see the same
/// virtual time.
#[derive(Debug, Clone)]
pub struct SimWire {
    state: Rc<RefCell<WireState>>,
}

impl SimWire {
    /// A wire whose far end never drives it, so it idles at `released`.
    pub fn new(released: Level) -> Self {
        Self::from_script(Script::new(released))
    }

    /// A wire whose far end follows `script`.
    pub fn from_script(script: Script) -> Self {
        Self {
            state: Rc::new(RefCell::new(WireState {
                now: 0,
                read_cost_us: 1,
                initial: script.initial,
                peer: script.events,
                next_event: 0,
                output: false,
                latch: Level::High,
                trace: Vec::new(),
            })),
        }
    }

    /// Virtual time consumed by every pin read.
    pub fn read_cost_us(&self) -> u32 {
        self.state.borrow().read_cost_us
    }

    /// Moves virtual time forward.
    pub fn advance(&self, us: u32) {
        self.state.borrow_mut().now += us;
    }

    /// A pin handle.
    pub fn line(&self) -> SimLine {
        SimLine {
            state: Rc::clone(&self.state),
        }
    }

    /// A clock handle.
    pub fn clock(&self) -> SimClock {
        SimClock {
            state: Rc::clone(&self.state),
        }
    }

    /// A delay handle.
    pub fn delay(&self) -> SimDelay {
        SimDelay {
            state: Rc::clone(&self.state),
        }
    }

    /// Every level the local side put on the wire, with its start time.
    pub fn trace(&self) -> Vec<(u32, Level)> {
        self.state.borrow().trace.clone()
    }

    /// Returns `true` if the local side drove `level` at any time in `range`.
    pub fn drove(&self, level: Level, range: core::ops::Range<u32>) -> bool {
        self.state
            .borrow()
            .trace
            .iter()
            .any(|&(at, driven)| driven == level && range.contains(&at))
    }

    /// The recorded trace as a script, ready to feed another wire.
    pub fn trace_script(&self) -> Script {
        let state = self.state.borrow();
        let mut script = Script::new(Level::High);
        for &(at, level) in &state.trace {
            let gap = at - script.now();
            script = script.hold(gap).set(level);
        }
        script
    }
}

/// Pin handle of a [`SimWire`].
#[derive(Debug)]
pub struct SimLine {
    state: Rc<RefCell<WireState>>,
}

impl SimLine {
    fn read(&mut self) -> Level {
        let mut state = self.state.borrow_mut();
        let level = if state.output {
            state.latch
        } else {
            state.peer_level()
        };
        state.now += state.read_cost_us;
        level
    }

    fn drive(&mut self, level: Level) {
        let mut state = self.state.borrow_mut();
        state.latch = level;
        if state.output {
            state.record(level);
        }
    }
}

impl ErrorType for SimLine {
    type Error = Infallible;
}

impl InputPin for SimLine {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.read() == Level::High)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.read() == Level::Low)
    }
}

impl OutputPin for SimLine {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.drive(Level::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.drive(Level::High);
        Ok(())
    }
}

impl SignalLine for SimLine {
    fn set_as_input(&mut self) -> Result<(), Infallible> {
        let mut state = self.state.borrow_mut();
        if state.output {
            state.output = false;
            let released = state.peer_level();
            state.record(released);
        }
        Ok(())
    }

    fn set_as_output(&mut self) -> Result<(), Infallible> {
        let mut state = self.state.borrow_mut();
        state.output = true;
        let latch = state.latch;
        state.record(latch);
        Ok(())
    }
}

/// Clock handle of a [`SimWire`].
#[derive(Debug)]
pub struct SimClock {
    state: Rc<RefCell<WireState>>,
}

impl MicrosClock for SimClock {
    fn now_us(&mut self) -> u32 {
        self.state.borrow().now
    }
}

/// Delay handle of a [`SimWire`].
#[derive(Debug)]
pub struct SimDelay {
    state: Rc<RefCell<WireState>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.state.borrow_mut().now += ns.div_ceil(1_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.state.borrow_mut().now += us;
    }
}
