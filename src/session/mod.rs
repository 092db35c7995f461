//! The two ends of the link.
//!
//! - [`recv::RecvSession`] emulates the remote: it follows the host's
//!   clock, decodes packets and answers in the slots the host grants it.
//! - [`host::HostSession`] emulates the host: it owns the cadence, sends
//!   queued payloads and text, and reads back whatever the remote offers.

pub mod host;
pub mod recv;

pub use host::{Exchange, HostSession};
pub use recv::{PollOutcome, RecvSession, RecvStats};
