//! Error types for the link layer.
//!
//! None of these are fatal. Every failure leaves the session in a state from
//! which the next reset or the next poll cycle starts cleanly.

use thiserror::Error;

/// Result type for link operations.
pub type Result<T> = core::result::Result<T, LinkError>;

/// Errors encountered while driving or listening on the line.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkError {
    /// The peer never toggled the line within the allowed wait.
    #[error("line did not change level within {waited_us} us")]
    Timeout {
        /// How long the busy-wait ran before giving up.
        waited_us: u32,
    },

    /// A framed packet failed its XOR parity check.
    #[error("parity mismatch: computed {expected}, received {received}")]
    Parity {
        /// Parity computed over the received payload.
        expected: u8,
        /// Parity byte found on the wire.
        received: u8,
    },

    /// A send was requested while the outbound buffer is still pending.
    #[error("an outbound payload is already queued")]
    QueueBusy,

    /// The payload does not fit in a packet.
    #[error("payload of {len} bytes does not fit in a packet")]
    PayloadTooLong {
        /// Length of the rejected payload.
        len: usize,
    },

    /// Text holds a byte that cannot be shown on the remote display.
    #[error("unprintable text byte at index {index}")]
    UnprintableText {
        /// Byte offset of the first rejected byte.
        index: usize,
    },

    /// The HAL reported an error on the line pin.
    #[error("line pin error")]
    Pin,
}

impl LinkError {
    /// Returns `true` for the starvation case, where the peer stopped driving the line.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LinkError::Timeout { .. })
    }
}
