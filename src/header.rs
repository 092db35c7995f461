//! Arbitration header flags.
//!
//! Each side publishes one flag byte per exchange. The byte sits in the same
//! wire position for both roles but the bits mean different things, so the
//! two vocabularies are separate types: [`HostHeader`] and [`RemoteHeader`].
//!
//! One-shot requests (`ReadyForText`, `TimerRequest`) are consumed with
//! [`Header::take`], which reads and clears the bit in one step so each
//! assertion is acted on exactly once.

use core::fmt;
use core::marker::PhantomData;

use crate::consts::{
    HOST_BUS_AVAIL, HOST_DATA_AVAIL, HOST_ERROR, HOST_READY, REMOTE_ERROR, REMOTE_IS_INIT,
    REMOTE_READY_FOR_TEXT, REMOTE_TIMER_REQUEST, REMOTE_TX_READY,
};

/// A bit of a header vocabulary.
pub trait HeaderBit: Copy {
    /// Bit position, LSB = 0.
    fn position(self) -> u8;

    /// Single-bit mask.
    fn mask(self) -> u8 {
        1 << self.position()
    }
}

/// Bits owned by the host-emulation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum HostBit {
    /// Data available. Inverted on the wire.
    DataAvail,
    /// The remote may use this exchange window.
    BusAvail,
    /// Host error.
    Error,
    /// The host is ready.
    HostReady,
}

impl HeaderBit for HostBit {
    fn position(self) -> u8 {
        match self {
            HostBit::DataAvail => HOST_DATA_AVAIL,
            HostBit::BusAvail => HOST_BUS_AVAIL,
            HostBit::Error => HOST_ERROR,
            HostBit::HostReady => HOST_READY,
        }
    }
}

/// Bits owned by the remote-emulation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RemoteBit {
    /// The remote wants the next text fragment.
    ReadyForText,
    /// The remote asks for the display timer.
    TimerRequest,
    /// The remote has a payload queued.
    TxReady,
    /// Remote error.
    Error,
    /// The remote finished initialising.
    IsInit,
}

impl HeaderBit for RemoteBit {
    fn position(self) -> u8 {
        match self {
            RemoteBit::ReadyForText => REMOTE_READY_FOR_TEXT,
            RemoteBit::TimerRequest => REMOTE_TIMER_REQUEST,
            RemoteBit::TxReady => REMOTE_TX_READY,
            RemoteBit::Error => REMOTE_ERROR,
            RemoteBit::IsInit => REMOTE_IS_INIT,
        }
    }
}

/// A header byte interpreted through the vocabulary `B`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Header<B> {
    bits: u8,
    _vocabulary: PhantomData<B>,
}

/// Flags published by the host-emulation role.
pub type HostHeader = Header<HostBit>;
/// Flags published by the remote-emulation role.
pub type RemoteHeader = Header<RemoteBit>;

impl<B: HeaderBit> Header<B> {
    /// A header with no bits set.
    pub const fn empty() -> Self {
        Self::from_bits(0)
    }

    /// Wraps a raw header byte.
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            bits,
            _vocabulary: PhantomData,
        }
    }

    /// The raw header byte.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Returns `true` if no bit is set.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Returns `true` if `bit` is set.
    pub fn contains(&self, bit: B) -> bool {
        self.bits & bit.mask() != 0
    }

    /// Sets `bit`.
    pub fn insert(&mut self, bit: B) {
        self.bits |= bit.mask();
    }

    /// Clears `bit`.
    pub fn remove(&mut self, bit: B) {
        self.bits &= !bit.mask();
    }

    /// Sets or clears `bit`.
    pub fn set(&mut self, bit: B, value: bool) {
        if value {
            self.insert(bit);
        } else {
            self.remove(bit);
        }
    }

    /// Reads and clears `bit`.
    pub fn take(&mut self, bit: B) -> bool {
        let was_set = self.contains(bit);
        self.remove(bit);
        was_set
    }
}

impl<B: HeaderBit> Default for Header<B> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<B> fmt::Debug for Header<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Header({:#010b})", self.bits)
    }
}

#[cfg(feature = "defmt-0-3")]
impl<B> defmt::Format for Header<B> {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "Header({=u8:b})", self.bits)
    }
}

impl HostHeader {
    /// Returns `true` if the host signals data available.
    ///
    /// The wire bit is inverted: `0` means available.
    pub fn data_available(&self) -> bool {
        !self.contains(HostBit::DataAvail)
    }

    /// Publishes data availability, inverting the wire bit.
    pub fn set_data_available(&mut self, available: bool) {
        self.set(HostBit::DataAvail, !available);
    }

    /// Returns `true` if the remote may transmit in this exchange window.
    pub fn bus_available(&self) -> bool {
        self.contains(HostBit::BusAvail)
    }

    /// Hands the bus to the remote for this window, or takes it back.
    pub fn set_bus_available(&mut self, available: bool) {
        self.set(HostBit::BusAvail, available);
    }

    /// Returns `true` if the host is ready. Packets without it are ignored.
    pub fn is_ready(&self) -> bool {
        self.contains(HostBit::HostReady)
    }
}

impl RemoteHeader {
    /// Returns `true` if the remote wants to send a payload.
    pub fn tx_ready(&self) -> bool {
        self.contains(RemoteBit::TxReady)
    }

    /// Returns `true` if the remote reports an error.
    pub fn is_error(&self) -> bool {
        self.contains(RemoteBit::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_is_one_shot() {
        let mut header = RemoteHeader::empty();
        header.insert(RemoteBit::ReadyForText);
        assert!(header.take(RemoteBit::ReadyForText));
        assert!(!header.take(RemoteBit::ReadyForText));
    }

    #[test]
    fn test_take_leaves_other_bits() {
        let mut header = RemoteHeader::from_bits(0x96);
        assert!(header.take(RemoteBit::TimerRequest));
        assert_eq!(header.bits(), 0x92);
        assert!(header.tx_ready());
        assert!(header.contains(RemoteBit::IsInit));
    }

    #[test]
    fn test_data_available_is_inverted() {
        let mut header = HostHeader::empty();
        assert!(header.data_available());
        header.set_data_available(false);
        assert_eq!(header.bits(), 0x01);
        assert!(!header.data_available());
        header.set_data_available(true);
        assert_eq!(header.bits(), 0x00);
    }

    #[test]
    fn test_host_bits_match_wire_positions() {
        let mut header = HostHeader::empty();
        header.insert(HostBit::HostReady);
        header.set_bus_available(true);
        assert_eq!(header.bits(), 0x90);
        assert!(header.is_ready());
        assert!(header.bus_available());
        header.insert(HostBit::Error);
        assert_eq!(header.bits(), 0xD0);
    }

    #[test]
    fn test_same_byte_reads_differently_per_role() {
        let host = HostHeader::from_bits(0x10);
        let remote = RemoteHeader::from_bits(0x10);
        assert!(host.bus_available());
        assert!(remote.tx_ready());
        assert!(!host.is_ready());
    }
}
