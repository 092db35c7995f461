//! Peripheral-emulation role.
//!
//! [`RecvSession`] listens on the line, decodes the host's packets and
//! answers when the host hands it the bus. Each call to
//! [`poll`](RecvSession::poll) runs the decode loop until one exchange is
//! over:
//!
//! ```text
//! AwaitingSync --reset--> ResetDetected --sync bit--> GatheringPacket
//!      ^                                                    |
//!      +------ 13 bytes / header verdict / silence ---------+
//! ```
//!
//! While the host clocks the first byte of a packet, the remote overlays its
//! own flag byte onto the slots, one bit per slot. That is how the host learns
//! that the remote has something to say or wants more text.

use embedded_hal::delay::DelayNs;

use crate::assembler::{LinkState, PacketAssembler, Progress};
use crate::config::Timing;
use crate::consts::{HEADER_INDEX, PAYLOAD_LEN, REG_CAPABILITIES_BLOCK, RESET_NOISE_BITS, SYNC_INDEX};
use crate::decoder::{BitDecoder, Symbol};
use crate::encoder::PulseEncoder;
use crate::error::{LinkError, Result};
use crate::header::{HostHeader, RemoteBit, RemoteHeader};
use crate::line::{Level, MicrosClock, PulseClock, SignalLine, read_level};
use crate::listener::{LinkListener, NoopListener};
use crate::parity::parity;
use crate::queue::OutboundQueue;
use crate::register::{Command, RegisterMap, capability_block};
use crate::text::TextAssembler;

/// How an exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum PollOutcome {
    /// A parity-valid packet from a ready host.
    Packet([u8; PAYLOAD_LEN]),
    /// The host sent only its header.
    KeepAlive,
    /// The host header lacked its ready bit; the exchange was skipped.
    PeerNotReady,
    /// The queued payload went out in the host's bus window.
    Sent,
    /// A packet failed its parity check or was cut short.
    Dropped,
}

/// Packet counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct RecvStats {
    /// Packets delivered.
    pub good: u32,
    /// Packets dropped on parity or truncation.
    pub dropped: u32,
}

/// The listening end of the link.
#[derive(Debug)]
pub struct RecvSession<L, C, D, N = NoopListener> {
    line: L,
    clock: C,
    delay: D,
    timing: Timing,
    decoder: BitDecoder,
    encoder: PulseEncoder,
    pulse: PulseClock,
    assembler: PacketAssembler,
    state: LinkState,
    flags: RemoteHeader,
    outbound: OutboundQueue,
    registers: RegisterMap,
    text: TextAssembler,
    listener: N,
    stats: RecvStats,
}

impl<L, C, D> RecvSession<L, C, D, NoopListener>
where
    L: SignalLine,
    C: MicrosClock,
    D: DelayNs,
{
    /// Releases the line and starts listening for a reset.
    pub fn new(line: L, clock: C, delay: D, timing: Timing) -> Result<Self> {
        Self::with_listener(line, clock, delay, timing, NoopListener)
    }
}

impl<L, C, D, N> RecvSession<L, C, D, N>
where
    L: SignalLine,
    C: MicrosClock,
    D: DelayNs,
    N: LinkListener,
{
    /// Like [`new`](RecvSession::new), reporting packets and text to `listener`.
    pub fn with_listener(
        mut line: L,
        mut clock: C,
        delay: D,
        timing: Timing,
        listener: N,
    ) -> Result<Self> {
        line.set_as_input().map_err(|_| LinkError::Pin)?;
        let level = read_level(&mut line)?;
        let pulse = PulseClock::new(level, clock.now_us());

        let mut flags = RemoteHeader::empty();
        flags.insert(RemoteBit::IsInit);
        flags.insert(RemoteBit::ReadyForText);
        info!("listening, line {}", level == Level::High);

        Ok(Self {
            line,
            clock,
            delay,
            timing,
            decoder: BitDecoder::new(&timing),
            encoder: PulseEncoder::new(&timing),
            pulse,
            assembler: PacketAssembler::new(),
            state: LinkState::AwaitingSync,
            flags,
            outbound: OutboundQueue::new(),
            registers: RegisterMap::new(),
            text: TextAssembler::new(),
            listener,
            stats: RecvStats::default(),
        })
    }

    /// Runs the decode loop until one exchange with the host is over.
    ///
    /// Fails with [`LinkError::Timeout`] if no reset shows up within
    /// [`Timing::max_wait_us`], or if the host stalls mid-preamble or
    /// mid-answer. The session is back in [`LinkState::AwaitingSync`] after
    /// any error.
    pub fn poll(&mut self) -> Result<PollOutcome> {
        let started = self.clock.now_us();
        loop {
            let step = match self.state {
                LinkState::AwaitingSync => self.await_sync(started),
                LinkState::ResetDetected => self.consume_preamble(),
                LinkState::GatheringPacket => self.gather(),
            };
            match step {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(err) => {
                    if err.is_timeout() {
                        warn!("link starved: {}", err);
                    }
                    self.assembler.restart();
                    self.state = LinkState::AwaitingSync;
                    return Err(err);
                }
            }
        }
    }

    fn await_sync(&mut self, started: u32) -> Result<Option<PollOutcome>> {
        loop {
            let pulse = self
                .pulse
                .wait_change(&mut self.line, &mut self.clock, self.timing.max_wait_us)?;
            if self.decoder.classify(pulse) == Symbol::Reset {
                self.state = LinkState::ResetDetected;
                return Ok(None);
            }
            let waited_us = self.clock.now_us().wrapping_sub(started);
            if waited_us > self.timing.max_wait_us {
                return Err(LinkError::Timeout { waited_us });
            }
        }
    }

    /// Skips the sync bit and stops on the falling edge of the first slot.
    ///
    /// A fresh reset in place of the sync bit restarts the preamble.
    fn consume_preamble(&mut self) -> Result<Option<PollOutcome>> {
        let budget = self.timing.end_msg_timeout_us;
        for _ in 0..3 {
            let pulse = self
                .pulse
                .wait_change(&mut self.line, &mut self.clock, budget)?;
            if self.decoder.classify(pulse) == Symbol::Reset {
                trace!("reset repeated in preamble");
                return Ok(None);
            }
        }

        self.flags.set(RemoteBit::TxReady, self.outbound.is_pending());
        self.assembler.restart();
        self.state = LinkState::GatheringPacket;
        self.overlay_flag()?;
        Ok(None)
    }

    fn gather(&mut self) -> Result<Option<PollOutcome>> {
        let pulse = match self.pulse.wait_change(
            &mut self.line,
            &mut self.clock,
            self.timing.end_msg_timeout_us,
        ) {
            Ok(pulse) => pulse,
            Err(LinkError::Timeout { .. }) => return Ok(Some(self.end_by_silence())),
            Err(err) => return Err(err),
        };

        let symbol = self.decoder.classify(pulse);
        let Some(bit) = symbol.bit() else {
            if symbol == Symbol::Reset {
                let bits = self.assembler.bit_count();
                if bits >= RESET_NOISE_BITS {
                    warn!("reset after {} bits of byte {}", bits, self.assembler.byte_index());
                }
                self.assembler.restart();
                self.state = LinkState::ResetDetected;
            } else {
                self.overlay_flag()?;
            }
            return Ok(None);
        };

        match self.assembler.push_bit(bit) {
            Progress::Byte(HEADER_INDEX) => self.on_header(),
            Progress::Complete => Ok(Some(self.on_complete())),
            Progress::Bit | Progress::Byte(_) => Ok(None),
        }
    }

    /// Drives our flag bit onto the slot the host is about to sample.
    ///
    /// Only the slots of the first byte carry flags. Payload bytes are never
    /// touched.
    fn overlay_flag(&mut self) -> Result<()> {
        if self.assembler.byte_index() != SYNC_INDEX {
            return Ok(());
        }
        let slot = self.assembler.bit_count();
        if self.flags.bits() & (1 << slot) == 0 {
            return Ok(());
        }
        self.encoder.assert_slot(&mut self.line, &mut self.delay)?;
        let now = self.clock.now_us();
        self.pulse.rebase(Level::Low, now);
        Ok(())
    }

    fn on_header(&mut self) -> Result<Option<PollOutcome>> {
        let Some(bits) = self.assembler.packet().header() else {
            return Ok(None);
        };
        let header = HostHeader::from_bits(bits);

        if !header.is_ready() {
            trace!("host not ready, header {}", bits);
            self.finish();
            return Ok(Some(PollOutcome::PeerNotReady));
        }
        if header.bus_available() {
            self.finish();
            let Some(&payload) = self.outbound.peek() else {
                return Ok(Some(PollOutcome::KeepAlive));
            };
            self.answer(&payload)?;
            let _ = self.outbound.pop();
            debug!("queued payload sent, command {}", payload[0]);
            return Ok(Some(PollOutcome::Sent));
        }
        if !header.data_available() {
            trace!("keep-alive");
            self.finish();
            return Ok(Some(PollOutcome::KeepAlive));
        }
        Ok(None)
    }

    fn on_complete(&mut self) -> PollOutcome {
        let packet = self.assembler.take();
        self.state = LinkState::AwaitingSync;
        match packet.payload() {
            Some(Ok(payload)) => {
                self.stats.good += 1;
                self.listener.on_packet(&payload);
                self.dispatch(&payload);
                PollOutcome::Packet(payload)
            }
            Some(Err(err)) => {
                self.stats.dropped += 1;
                warn!("packet dropped: {}", err);
                PollOutcome::Dropped
            }
            None => PollOutcome::Dropped,
        }
    }

    fn end_by_silence(&mut self) -> PollOutcome {
        let packet = self.assembler.take();
        self.state = LinkState::AwaitingSync;
        if packet.is_header_only() {
            trace!("keep-alive");
            PollOutcome::KeepAlive
        } else {
            self.stats.dropped += 1;
            debug!("packet cut short after {} bytes", packet.len());
            PollOutcome::Dropped
        }
    }

    fn finish(&mut self) {
        self.assembler.restart();
        self.state = LinkState::AwaitingSync;
    }

    /// Sends `payload` and its parity into the host's read-back slots.
    ///
    /// The host emits a clock pulse before every byte and then samples eight
    /// slots. A `1` is asserted by driving the released line high.
    fn answer(&mut self, payload: &[u8; PAYLOAD_LEN]) -> Result<()> {
        debug!("answering in bus window");
        let budget = self.timing.end_msg_timeout_us;
        let trailer = parity(payload);
        for &byte in payload.iter().chain(core::iter::once(&trailer)) {
            self.pulse
                .wait_for(&mut self.line, &mut self.clock, Level::Low, budget)?;
            self.pulse
                .wait_for(&mut self.line, &mut self.clock, Level::High, budget)?;
            for i in 0..8 {
                self.pulse
                    .wait_for(&mut self.line, &mut self.clock, Level::Low, budget)?;
                if byte & (1 << i) != 0 {
                    self.encoder.assert_slot(&mut self.line, &mut self.delay)?;
                    let now = self.clock.now_us();
                    self.pulse.rebase(Level::Low, now);
                }
                self.pulse
                    .wait_for(&mut self.line, &mut self.clock, Level::High, budget)?;
            }
        }
        Ok(())
    }

    /// Applies a delivered payload. Every command is handled on its own.
    fn dispatch(&mut self, payload: &[u8; PAYLOAD_LEN]) {
        let Ok(command) = Command::try_from(payload[0]) else {
            trace!("unknown command {}", payload[0]);
            return;
        };
        match command {
            Command::Capabilities => {
                let block = payload[REG_CAPABILITIES_BLOCK];
                let Some(reply) = capability_block(block) else {
                    trace!("no capability block {}", block);
                    return;
                };
                if self.outbound.push(&reply).is_err() {
                    warn!("capability block {} not queued, send pending", block);
                }
            }
            Command::Text => {
                self.flags.insert(RemoteBit::ReadyForText);
                self.flags.remove(RemoteBit::TimerRequest);
                if let Some(text) = self.text.push_fragment(payload) {
                    self.flags.remove(RemoteBit::ReadyForText);
                    self.listener.on_text(text);
                }
            }
            Command::Track => {
                if self.registers.apply(command, payload) {
                    self.text.clear();
                    self.flags.insert(RemoteBit::ReadyForText);
                }
            }
            _ => {
                let _ = self.registers.apply(command, payload);
            }
        }
    }

    /// Queues `data` for the next bus window the host grants.
    pub fn queue(&mut self, data: &[u8]) -> Result<()> {
        self.outbound.push(data)?;
        debug!("queued {} bytes", data.len());
        Ok(())
    }

    /// Returns `true` while a queued payload waits for a bus window.
    pub fn is_send_pending(&self) -> bool {
        self.outbound.is_pending()
    }

    /// Raises one of our flags.
    pub fn set_flag(&mut self, bit: RemoteBit) {
        self.flags.insert(bit);
    }

    /// Clears one of our flags.
    pub fn clear_flag(&mut self, bit: RemoteBit) {
        self.flags.remove(bit);
    }

    /// Flags overlaid on the next packet.
    pub fn flags(&self) -> RemoteHeader {
        self.flags
    }

    /// Current decode state.
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Registers received so far.
    pub fn registers(&self) -> &RegisterMap {
        &self.registers
    }

    /// Text received so far.
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    /// Packet counters.
    pub fn stats(&self) -> RecvStats {
        self.stats
    }

    /// The listener.
    pub fn listener(&self) -> &N {
        &self.listener
    }

    /// The listener, mutably.
    pub fn listener_mut(&mut self) -> &mut N {
        &mut self.listener
    }

    /// Gives the hardware back.
    pub fn free(self) -> (L, C, D) {
        (self.line, self.clock, self.delay)
    }
}
