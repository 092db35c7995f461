//! XOR parity trailer.
//!
//! Every packet ends with the XOR of its payload bytes. The receive side
//! drops a packet whose trailer does not match; the send side appends the
//! trailer after the payload.

use crate::error::{LinkError, Result};

/// XOR-fold of all bytes.
pub fn parity(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Checks `received` against the parity of `payload`.
pub fn verify(payload: &[u8], received: u8) -> Result<()> {
    let expected = parity(payload);
    if expected == received {
        Ok(())
    } else {
        Err(LinkError::Parity { expected, received })
    }
}
