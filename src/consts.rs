//! Constants used across the link protocol implementation.
//!
//! This module defines the packet framing, the arbitration header bit
//! positions of both roles, the command vocabulary carried in the first
//! payload byte, and the text fragment layout.
//!
//! ## Key Concepts
//!
//! - **Packet**: 13 bytes on the wire. Byte `0` is the sync/read-back byte,
//!   byte `1` is the arbitration header, bytes `2..12` are the payload and
//!   byte `12` is the XOR parity of the payload.
//! - **Header bits**: both roles publish a flag byte in the same position,
//!   but each role assigns its own meaning to the bits.
//! - **Text fragments**: a long string is streamed 7 bytes at a time inside
//!   `CMD_TEXT` packets.
//!
//! Timing values live in [`Timing`](crate::config::Timing) so they can be
//! tuned per board.

/// Total number of bytes in a framed packet, headers and parity included.
pub const PACKET_LEN: usize = 13;

/// Number of payload bytes carried by every packet.
pub const PAYLOAD_LEN: usize = 10;

/// Index of the sync byte. On the host side this is the byte read back from
/// the remote during the tri-state header exchange.
pub const SYNC_INDEX: usize = 0;

/// Index of the arbitration header byte.
pub const HEADER_INDEX: usize = 1;

/// Index of the first payload byte (the command id).
pub const PAYLOAD_INDEX: usize = 2;

/// Index of the trailing parity byte.
pub const PARITY_INDEX: usize = PAYLOAD_INDEX + PAYLOAD_LEN;

/// Packets with this many bytes or fewer carry only headers.
///
/// The host continually sends header-only packets as a keep-alive.
pub const HEADER_ONLY_LEN: usize = 2;

/// A reset seen after this many bits of a byte is reported as an
/// unexpected interruption instead of a routine re-sync.
pub const RESET_NOISE_BITS: u8 = 4;

// Host-emulation header bits.

/// Host header: data available. Inverted on the wire, `0` means available.
pub const HOST_DATA_AVAIL: u8 = 0;
/// Host header: the bus is handed to the remote for this exchange window.
pub const HOST_BUS_AVAIL: u8 = 4;
/// Host header: error.
pub const HOST_ERROR: u8 = 6;
/// Host header: the host is ready. Packets without it are ignored.
pub const HOST_READY: u8 = 7;

// Remote-emulation header bits.

/// Remote header: the remote wants the next text fragment.
pub const REMOTE_READY_FOR_TEXT: u8 = 1;
/// Remote header: the remote asks for the display timer.
pub const REMOTE_TIMER_REQUEST: u8 = 2;
/// Remote header: the remote has a payload queued and wants to talk.
pub const REMOTE_TX_READY: u8 = 4;
/// Remote header: error.
pub const REMOTE_ERROR: u8 = 6;
/// Remote header: the remote finished its initialisation.
pub const REMOTE_IS_INIT: u8 = 7;

// Command ids, payload byte 0.

/// Capability block request / reply.
pub const CMD_CAPABILITIES: u8 = 0x01;
/// Display mode.
pub const CMD_DISPLAY_MODE: u8 = 0x03;
/// Backlight.
pub const CMD_BACKLIGHT: u8 = 0x05;
/// Volume level.
pub const CMD_VOLUME: u8 = 0x40;
/// Play mode (normal, repeat, shuffle...).
pub const CMD_PLAY_MODE: u8 = 0x41;
/// Recording indicator.
pub const CMD_REC_MODE: u8 = 0x42;
/// Battery state.
pub const CMD_BATTERY: u8 = 0x43;
/// Equaliser.
pub const CMD_EQ: u8 = 0x46;
/// Alarm indicator.
pub const CMD_ALARM: u8 = 0x47;
/// Track number.
pub const CMD_TRACK: u8 = 0xA0;
/// Play state.
pub const CMD_PLAY_STATE: u8 = 0xA1;
/// Display.
pub const CMD_DISPLAY: u8 = 0xA2;
/// Text fragment.
pub const CMD_TEXT: u8 = 0xC8;
/// Joint text: request the write address.
pub const CMD_SYNC_GET_ADDR: u8 = 0x18;
/// Joint text: track count.
pub const CMD_SYNC_TRACK_COUNT: u8 = 0xD8;
/// Joint text: set track.
pub const CMD_SYNC_SET_TRACK: u8 = 0xD9;

// Text fragments.

/// Payload index of the text sub-command.
pub const REG_TEXT: usize = 1;
/// Payload index of the first text byte.
pub const REG_TEXT_POSITION: usize = 3;
/// Text bytes carried per fragment.
pub const TEXT_CHUNK_LEN: usize = 7;
/// Longest text either side will hold.
pub const MAX_TEXT_LEN: usize = 64;
/// Filler for text slots past the end of the string.
pub const TEXT_END_MARKER: u8 = 0xFF;
/// Text sub-command: more fragments follow.
pub const TEXT_APPEND: u8 = 0x02;
/// Text sub-command: last fragment.
pub const TEXT_END: u8 = 0x01;

/// Payload index of the requested capability block.
pub const REG_CAPABILITIES_BLOCK: usize = 2;
/// First byte of every capability reply sent by the remote.
pub const CAPABILITY_REMOTE: u8 = 0xC0;
