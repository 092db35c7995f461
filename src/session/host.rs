//! Host-emulation role.
//!
//! [`HostSession`] owns the line and drives every exchange. Each exchange
//! starts with a reset and the sync bit, then the header turn: the host
//! clocks eight slots while the remote overlays its flags, and answers with
//! its own header byte. What follows depends on both headers:
//!
//! - a queued payload and its parity, or
//! - a ten byte read-back when the remote raised `TX_READY`, or
//! - nothing, which makes the exchange a keep-alive.
//!
//! [`poll`](HostSession::poll) never blocks on the cadence: it returns
//! [`nb::Error::WouldBlock`] until the keep-alive interval has passed, unless
//! a payload or a text fragment is owed.

use embedded_hal::delay::DelayNs;

use crate::config::Timing;
use crate::consts::PAYLOAD_LEN;
use crate::encoder::PulseEncoder;
use crate::error::{LinkError, Result};
use crate::header::{HostBit, HostHeader, RemoteBit, RemoteHeader};
use crate::line::{Level, MicrosClock, SignalLine, write_level};
use crate::parity;
use crate::queue::OutboundQueue;
use crate::register::capability_request;
use crate::text::TextChunker;

/// What an exchange accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Exchange {
    /// Header-only cycle. Carries the remote's flags.
    KeepAlive(RemoteHeader),
    /// The remote had data and it passed its parity check.
    ReadBack([u8; PAYLOAD_LEN]),
    /// The queued payload went out. Carries the remote's flags.
    Sent(RemoteHeader),
    /// A text fragment went out.
    Text {
        /// `true` if it was the last fragment.
        complete: bool,
    },
}

/// The driving end of the link.
#[derive(Debug)]
pub struct HostSession<L, C, D> {
    line: L,
    clock: C,
    delay: D,
    timing: Timing,
    encoder: PulseEncoder,
    flags: HostHeader,
    peer: RemoteHeader,
    outbound: OutboundQueue,
    chunker: TextChunker,
    last_cycle_us: u32,
}

impl<L, C, D> HostSession<L, C, D>
where
    L: SignalLine,
    C: MicrosClock,
    D: DelayNs,
{
    /// Takes the line over, drives it high and lets it settle.
    pub fn new(mut line: L, mut clock: C, mut delay: D, timing: Timing) -> Result<Self> {
        line.set_as_output().map_err(|_| LinkError::Pin)?;
        write_level(&mut line, Level::High)?;
        delay.delay_us(timing.line_settle_us);
        let last_cycle_us = clock.now_us();
        info!("host driving line, keep-alive every {} us", timing.keepalive_interval_us);

        Ok(Self {
            line,
            clock,
            delay,
            timing,
            encoder: PulseEncoder::new(&timing),
            flags: HostHeader::empty(),
            peer: RemoteHeader::empty(),
            outbound: OutboundQueue::new(),
            chunker: TextChunker::new(),
            last_cycle_us,
        })
    }

    /// Runs one exchange if one is due.
    ///
    /// A queued payload goes first, then the next text fragment if the remote
    /// asked for one, then the keep-alive once the interval has elapsed.
    pub fn poll(&mut self) -> nb::Result<Exchange, LinkError> {
        if let Some(&payload) = self.outbound.peek() {
            let peer = self.send_packet(&payload)?;
            let _ = self.outbound.pop();
            return Ok(Exchange::Sent(peer));
        }

        if self.chunker.is_pending() && self.peer.take(RemoteBit::ReadyForText) {
            return match self.send_next_chunk() {
                Ok(complete) => Ok(Exchange::Text { complete }),
                Err(err) => {
                    self.peer.insert(RemoteBit::ReadyForText);
                    Err(err.into())
                }
            };
        }

        let elapsed = self.clock.now_us().wrapping_sub(self.last_cycle_us);
        if elapsed < self.timing.keepalive_interval_us {
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.exchange()?)
    }

    /// Sends the current text fragment and moves past it only once it is out.
    fn send_next_chunk(&mut self) -> Result<bool> {
        let Some((payload, complete)) = self.chunker.peek_chunk() else {
            return Ok(true);
        };
        let _ = self.send_packet(&payload)?;
        self.chunker.advance();
        debug!("text fragment sent, last {}", complete);
        Ok(complete)
    }

    /// Reset, sync bit and header turn of a write.
    fn send_packet(&mut self, payload: &[u8]) -> Result<RemoteHeader> {
        self.encoder.send_reset(&mut self.line, &mut self.delay)?;
        self.encoder.send_zero(&mut self.line, &mut self.delay)?;
        self.flags.set_data_available(true);
        self.flags.set_bus_available(false);
        let peer = self.send_header(false)?;
        self.encoder
            .send_frame(&mut self.line, &mut self.delay, payload)?;
        self.last_cycle_us = self.clock.now_us();
        debug!("sent command {}", payload.first().copied().unwrap_or_default());
        Ok(peer)
    }

    /// Reads the remote's flags from the first byte, then sends ours.
    ///
    /// With `allow_read` the bus is handed to a remote that raised `TX_READY`.
    fn send_header(&mut self, allow_read: bool) -> Result<RemoteHeader> {
        let peer = self.encoder.read_byte(&mut self.line, &mut self.delay)?;
        let peer = RemoteHeader::from_bits(peer);
        self.flags.insert(HostBit::HostReady);
        if allow_read && peer.tx_ready() {
            self.flags.set_bus_available(true);
            self.flags.set_data_available(true);
        }
        self.encoder
            .send_byte(&mut self.line, &mut self.delay, self.flags.bits())?;
        self.peer = peer;
        Ok(peer)
    }

    /// Keep-alive cycle, reading back the remote's payload if it has one.
    fn exchange(&mut self) -> Result<Exchange> {
        self.last_cycle_us = self.clock.now_us();
        self.encoder.send_reset(&mut self.line, &mut self.delay)?;
        self.encoder.send_zero(&mut self.line, &mut self.delay)?;
        self.flags.set_bus_available(false);
        self.flags.set_data_available(false);
        let peer = self.send_header(true)?;

        if !peer.tx_ready() {
            trace!("keep-alive, remote flags {}", peer.bits());
            return Ok(Exchange::KeepAlive(peer));
        }

        debug!("remote has data, reading back");
        let mut payload = [0; PAYLOAD_LEN];
        for byte in payload.iter_mut() {
            *byte = self.clock_byte()?;
        }
        let received = self.clock_byte()?;
        if let Err(err) = parity::verify(&payload, received) {
            warn!("read-back dropped: {}", err);
            return Err(err);
        }
        Ok(Exchange::ReadBack(payload))
    }

    /// Clock pulse followed by eight read slots.
    fn clock_byte(&mut self) -> Result<u8> {
        self.delay.delay_us(self.encoder.long_us());
        self.encoder.send_zero(&mut self.line, &mut self.delay)?;
        self.encoder.read_byte(&mut self.line, &mut self.delay)
    }

    /// Queues `data` to go out at the next poll.
    pub fn queue(&mut self, data: &[u8]) -> Result<()> {
        self.outbound.push(data)?;
        debug!("queued {} bytes", data.len());
        Ok(())
    }

    /// Sends `data` right away.
    pub fn send(&mut self, data: &[u8]) -> Result<RemoteHeader> {
        if data.len() > PAYLOAD_LEN {
            return Err(LinkError::PayloadTooLong { len: data.len() });
        }
        let mut payload = [0; PAYLOAD_LEN];
        payload[..data.len()].copy_from_slice(data);
        self.send_packet(&payload)
    }

    /// Queues a request for capability `block`.
    pub fn request_capabilities(&mut self, block: u8) -> Result<()> {
        self.queue(&capability_request(block))
    }

    /// Replaces the text to stream.
    ///
    /// Fragments go out whenever the remote raises `READY_FOR_TEXT`.
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        self.chunker.set(text)
    }

    /// Restarts the current text and sends its first fragment right away.
    ///
    /// Returns `true` if that fragment was the last one.
    pub fn send_text(&mut self) -> Result<bool> {
        self.chunker.restart();
        self.send_next_chunk()
    }

    /// Returns `true` while text fragments are still owed.
    pub fn is_text_pending(&self) -> bool {
        self.chunker.is_pending()
    }

    /// Returns `true` while a queued payload waits for the next poll.
    pub fn is_send_pending(&self) -> bool {
        self.outbound.is_pending()
    }

    /// Flags the remote sent in the last exchange.
    pub fn peer(&self) -> RemoteHeader {
        self.peer
    }

    /// Reads and clears a one-shot remote flag.
    pub fn take_peer_flag(&mut self, bit: RemoteBit) -> bool {
        self.peer.take(bit)
    }

    /// Flags sent in the last exchange.
    pub fn flags(&self) -> HostHeader {
        self.flags
    }

    /// Gives the hardware back.
    pub fn free(self) -> (L, C, D) {
        (self.line, self.clock, self.delay)
    }
}
