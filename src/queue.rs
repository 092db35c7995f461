//! Single-slot outbound buffer.
//!
//! At most one payload waits to be sent at a time. A new payload is only
//! accepted once the previous one has gone out. Enqueue and dequeue both
//! happen on the poll thread, so the slot needs no lock.

use crate::consts::PAYLOAD_LEN;
use crate::error::{LinkError, Result};

/// One pending payload plus its length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboundQueue {
    buf: [u8; PAYLOAD_LEN],
    len: u8,
}

impl OutboundQueue {
    /// Creates an empty queue.
    pub const fn new() -> Self {
        Self {
            buf: [0; PAYLOAD_LEN],
            len: 0,
        }
    }

    /// Returns `true` if a payload is waiting.
    pub fn is_pending(&self) -> bool {
        self.len != 0
    }

    /// Length of the waiting payload, `0` if none.
    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Returns `true` if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Queues `data`, zero-padding it to a full payload.
    ///
    /// Fails with [`LinkError::QueueBusy`] while a previous payload is pending.
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        if self.is_pending() {
            return Err(LinkError::QueueBusy);
        }
        if data.len() > PAYLOAD_LEN {
            return Err(LinkError::PayloadTooLong { len: data.len() });
        }
        if data.is_empty() {
            return Ok(());
        }
        self.buf = [0; PAYLOAD_LEN];
        self.buf[..data.len()].copy_from_slice(data);
        self.len = data.len() as u8;
        Ok(())
    }

    /// The waiting payload without removing it.
    pub fn peek(&self) -> Option<&[u8; PAYLOAD_LEN]> {
        self.is_pending().then_some(&self.buf)
    }

    /// Removes and returns the waiting payload.
    pub fn pop(&mut self) -> Option<[u8; PAYLOAD_LEN]> {
        if !self.is_pending() {
            return None;
        }
        self.len = 0;
        Some(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_push_is_rejected_until_popped() {
        let mut queue = OutboundQueue::new();
        queue.push(&[0x01, 0x00, 0x01]).unwrap();
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.push(&[0x02]), Err(LinkError::QueueBusy));

        let payload = queue.pop().unwrap();
        assert_eq!(payload, [0x01, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0]);
        assert!(queue.is_empty());
        queue.push(&[0x02]).unwrap();
        assert!(queue.is_pending());
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let mut queue = OutboundQueue::new();
        assert_eq!(
            queue.push(&[0; PAYLOAD_LEN + 1]),
            Err(LinkError::PayloadTooLong {
                len: PAYLOAD_LEN + 1
            })
        );
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_new_payload_clears_old_bytes() {
        let mut queue = OutboundQueue::new();
        queue.push(&[0xFF; PAYLOAD_LEN]).unwrap();
        let _ = queue.pop();
        queue.push(&[0x05]).unwrap();
        assert_eq!(queue.peek(), Some(&[0x05, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
    }
}
