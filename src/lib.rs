//! # mdlink
//!
//! A portable, no_std link layer for the single-wire remote bus used by
//! portable MiniDisc players and their inline remotes.
//!
//! The bus is one open-drain line shared by two parties. The host owns the
//! clock: it frames every exchange with a reset, carries bits in the width of
//! its low pulses, and hands short slots to the remote so it can answer on the
//! same wire. This crate implements both ends:
//! - `embedded-hal` traits for digital I/O and timing
//! - pulse-width decoding that follows the host's clock instead of its own
//! - a one-byte arbitration header so each side can say what it wants
//! - interrupt-safe global session access with `critical-section`
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` and enables the simulated line in [`sim`] |
//! | `delay-loop`          | Blocking host loop paced by `embedded_hal::delay::DelayNs` |
//! | `timer-isr` (default) | Global host session polled from a timer interrupt |
//! | `defmt-0-3`           | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Protocol
//!
//! - **Packets** are a sync bit, a header byte, ten payload bytes and an XOR
//!   parity byte, LSB first.
//! - **Arbitration**: while the host clocks the header, the remote overlays
//!   its own flags; the host answers with its flags in the next byte.
//! - **Read-back**: when the host grants the bus, the remote drives its ten
//!   byte payload into slots the host clocks.
//! - **Text** longer than one packet is streamed seven bytes at a time, paced
//!   by the remote's ready-for-text flag.
//!
//! ## Usage
//!
//! Emulating the remote:
//!
//! ```ignore
//! use mdlink::{config::Timing, session::{PollOutcome, RecvSession}};
//!
//! let mut remote = RecvSession::new(line, clock, delay, Timing::default())?;
//! loop {
//!     if let Ok(PollOutcome::Packet(payload)) = remote.poll() {
//!         // ...
//!     }
//! }
//! ```
//!
//! Emulating the host, from a blocking loop:
//!
//! ```ignore
//! let mut host = HostSession::new(line, clock, delay, Timing::default())?;
//! host.set_text("Hello, MiniDisc")?;
//! mdlink::timer::run_host_loop(&mut host, &mut loop_delay, 1_000);
//! ```
//!
//! ## Integration Notes
//!
//! - Bit timing is in the tens of microseconds; run sessions with interrupts
//!   that could stretch a slot disabled or at a lower priority.
//! - The line needs a pull-down so a released slot reads low.
//! - Only one host session should be active per line.

#![deny(
    bad_style,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    unused_extern_crates,
    unused_import_braces
)]
#![warn(unused, dead_code)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(all(test, not(feature = "std")))]
extern crate std;

#[macro_use]
mod fmt;

#[cfg(feature = "timer-isr")]
pub use critical_section;

pub use heapless;

pub mod assembler;
pub mod config;
pub mod consts;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod line;
pub mod listener;
pub mod parity;
pub mod queue;
pub mod register;
pub mod session;
pub mod text;
pub mod timer;

#[cfg(any(test, feature = "std"))]
pub mod sim;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::Timing;
pub use error::{LinkError, Result};
pub use line::{Level, MicrosClock, SignalLine};
