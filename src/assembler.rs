//! Byte and packet framing.
//!
//! Decoded bits are shifted in LSB first: the first bit observed after a
//! byte boundary is bit 0. Eight bits make a byte and thirteen bytes make a
//! packet. A reset observed mid-packet throws the partial packet away.

use heapless::Vec;

use crate::consts::{HEADER_INDEX, HEADER_ONLY_LEN, PACKET_LEN, PARITY_INDEX, PAYLOAD_INDEX, PAYLOAD_LEN};
use crate::error::Result;
use crate::parity;

/// State of the receive-side decode loop.
///
/// `ResetDetected` is transient: it always resolves into `GatheringPacket`
/// once the sync preamble is consumed, or back into `AwaitingSync` if the
/// preamble never arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkState {
    /// Ignoring everything until a reset pulse.
    #[default]
    AwaitingSync,
    /// A reset was seen; the sync preamble is next.
    ResetDetected,
    /// Accumulating bits into the current packet.
    GatheringPacket,
}

/// What a pushed bit completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The bit went into a byte still being built.
    Bit,
    /// A byte was banked at the given index.
    Byte(usize),
    /// The last byte of the packet was banked.
    Complete,
}

/// A framed packet as gathered from the wire.
///
/// Holds between zero and [`PACKET_LEN`] bytes. Only a full-length packet
/// carries a payload; shorter ones are keep-alives or truncated frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPacket {
    bytes: Vec<u8, PACKET_LEN>,
}

impl RawPacket {
    /// Builds a packet from raw bytes, keeping at most [`PACKET_LEN`] of them.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let len = bytes.len().min(PACKET_LEN);
        let mut packet = Self::default();
        let _ = packet.bytes.extend_from_slice(&bytes[..len]);
        packet
    }

    /// The gathered bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of gathered bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing was gathered.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns `true` if the packet carries nothing past the headers.
    pub fn is_header_only(&self) -> bool {
        self.bytes.len() <= HEADER_ONLY_LEN
    }

    /// Returns `true` if all [`PACKET_LEN`] bytes were gathered.
    pub fn is_complete(&self) -> bool {
        self.bytes.len() == PACKET_LEN
    }

    /// The arbitration header byte, if it was gathered.
    pub fn header(&self) -> Option<u8> {
        self.bytes.get(HEADER_INDEX).copied()
    }

    /// Checks the parity trailer and returns the payload.
    ///
    /// Returns `None` if the packet is not complete.
    pub fn payload(&self) -> Option<Result<[u8; PAYLOAD_LEN]>> {
        if !self.is_complete() {
            return None;
        }
        let mut payload = [0; PAYLOAD_LEN];
        payload.copy_from_slice(&self.bytes[PAYLOAD_INDEX..PARITY_INDEX]);
        Some(parity::verify(&payload, self.bytes[PARITY_INDEX]).map(|()| payload))
    }
}

/// Accumulates decoded bits into bytes and bytes into a [`RawPacket`].
#[derive(Debug, Clone, Default)]
pub struct PacketAssembler {
    current: u8,
    bit_count: u8,
    packet: RawPacket,
}

impl PacketAssembler {
    /// Creates an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the partial byte and packet.
    pub fn restart(&mut self) {
        self.current = 0;
        self.bit_count = 0;
        self.packet.bytes.clear();
    }

    /// Bits gathered into the byte currently being built.
    pub fn bit_count(&self) -> u8 {
        self.bit_count
    }

    /// Index of the byte currently being built.
    pub fn byte_index(&self) -> usize {
        self.packet.len()
    }

    /// Bytes banked so far.
    pub fn packet(&self) -> &RawPacket {
        &self.packet
    }

    /// Shifts in one bit.
    pub fn push_bit(&mut self, bit: bool) -> Progress {
        if self.packet.is_complete() {
            return Progress::Complete;
        }
        if bit {
            self.current |= 1 << self.bit_count;
        }
        self.bit_count += 1;
        if self.bit_count < 8 {
            return Progress::Bit;
        }

        let _ = self.packet.bytes.push(self.current);
        self.current = 0;
        self.bit_count = 0;
        if self.packet.is_complete() {
            Progress::Complete
        } else {
            Progress::Byte(self.packet.len() - 1)
        }
    }

    /// Hands the gathered packet over and restarts.
    pub fn take(&mut self) -> RawPacket {
        let packet = core::mem::take(&mut self.packet);
        self.restart();
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;

    fn push_byte(assembler: &mut PacketAssembler, byte: u8) -> Progress {
        let mut progress = Progress::Bit;
        for i in 0..8 {
            progress = assembler.push_bit(byte & (1 << i) != 0);
        }
        progress
    }

    #[test]
    fn test_first_bit_is_lsb() {
        let mut assembler = PacketAssembler::new();
        assert_eq!(assembler.push_bit(true), Progress::Bit);
        for _ in 0..6 {
            assert_eq!(assembler.push_bit(false), Progress::Bit);
        }
        assert_eq!(assembler.push_bit(true), Progress::Byte(0));
        assert_eq!(assembler.packet().as_bytes(), &[0x81]);
        assert_eq!(assembler.bit_count(), 0);
    }

    #[test]
    fn test_completes_at_packet_length() {
        let mut assembler = PacketAssembler::new();
        for i in 0..PACKET_LEN - 1 {
            assert_eq!(push_byte(&mut assembler, i as u8), Progress::Byte(i));
        }
        assert_eq!(push_byte(&mut assembler, 0xEE), Progress::Complete);
        let packet = assembler.take();
        assert!(packet.is_complete());
        assert_eq!(packet.as_bytes()[PACKET_LEN - 1], 0xEE);
        assert_eq!(assembler.byte_index(), 0);
    }

    #[test]
    fn test_restart_discards_partial_packet() {
        let mut assembler = PacketAssembler::new();
        let _ = push_byte(&mut assembler, 0x80);
        let _ = assembler.push_bit(true);
        let _ = assembler.push_bit(true);
        assembler.restart();
        assert_eq!(assembler.bit_count(), 0);
        assert!(assembler.packet().is_empty());
        assert_eq!(push_byte(&mut assembler, 0x01), Progress::Byte(0));
        assert_eq!(assembler.packet().as_bytes(), &[0x01]);
    }

    #[test]
    fn test_payload_checks_parity() {
        let mut bytes = [0u8; PACKET_LEN];
        bytes[HEADER_INDEX] = 0x80;
        bytes[PAYLOAD_INDEX] = 0xA0;
        bytes[PAYLOAD_INDEX + 3] = 0x12;
        bytes[PARITY_INDEX] = 0xA0 ^ 0x12;
        let packet = RawPacket::from_bytes(&bytes);
        let payload = packet.payload().unwrap().unwrap();
        assert_eq!(payload[0], 0xA0);
        assert_eq!(payload[3], 0x12);

        bytes[PARITY_INDEX] = 0;
        let packet = RawPacket::from_bytes(&bytes);
        assert_eq!(
            packet.payload(),
            Some(Err(LinkError::Parity {
                expected: 0xB2,
                received: 0
            }))
        );
    }

    #[test]
    fn test_short_packets_have_no_payload() {
        let packet = RawPacket::from_bytes(&[0x00, 0x80]);
        assert!(packet.is_header_only());
        assert_eq!(packet.header(), Some(0x80));
        assert_eq!(packet.payload(), None);
    }
}
