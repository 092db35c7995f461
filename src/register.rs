//! Command vocabulary and the last value seen for each register.
//!
//! Payload byte 0 names the command; the value sits at a fixed index after
//! it. This module keeps the raw bytes and decodes a few of them. Display
//! formatting is left to the application.

use crate::consts::{
    CAPABILITY_REMOTE, CMD_ALARM, CMD_BACKLIGHT, CMD_BATTERY, CMD_CAPABILITIES, CMD_DISPLAY,
    CMD_DISPLAY_MODE, CMD_EQ, CMD_PLAY_MODE, CMD_PLAY_STATE, CMD_REC_MODE, CMD_SYNC_GET_ADDR,
    CMD_SYNC_SET_TRACK, CMD_SYNC_TRACK_COUNT, CMD_TEXT, CMD_TRACK, CMD_VOLUME, PAYLOAD_LEN,
    REG_CAPABILITIES_BLOCK,
};

/// Payload index of single-byte register values.
pub const REG_VALUE: usize = 1;
/// Payload index of the BCD track number.
pub const REG_TRACK: usize = 3;
/// Payload index of the play state.
pub const REG_PLAY_STATE: usize = 4;

/// Register value meaning "on" for backlight, recording and alarm.
pub const INDICATOR_ON: u8 = 0x7F;
/// Battery register value while charging.
pub const BATTERY_CHARGE: u8 = 0x7F;
/// Battery register value when low.
pub const BATTERY_LOW: u8 = 0x80;
/// Battery register value when empty.
pub const BATTERY_ZERO: u8 = 0x01;

/// Commands carried in payload byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Command {
    /// Capability block request or reply.
    Capabilities,
    /// Display mode.
    DisplayMode,
    /// Backlight.
    Backlight,
    /// Volume.
    Volume,
    /// Play mode.
    PlayMode,
    /// Recording indicator.
    RecMode,
    /// Battery.
    Battery,
    /// Equaliser.
    Eq,
    /// Alarm indicator.
    Alarm,
    /// Track number.
    Track,
    /// Play state.
    PlayState,
    /// Display.
    Display,
    /// Text fragment.
    Text,
    /// Joint text: request the write address.
    SyncGetAddr,
    /// Joint text: track count.
    SyncTrackCount,
    /// Joint text: set track.
    SyncSetTrack,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, u8> {
        Ok(match id {
            CMD_CAPABILITIES => Command::Capabilities,
            CMD_DISPLAY_MODE => Command::DisplayMode,
            CMD_BACKLIGHT => Command::Backlight,
            CMD_VOLUME => Command::Volume,
            CMD_PLAY_MODE => Command::PlayMode,
            CMD_REC_MODE => Command::RecMode,
            CMD_BATTERY => Command::Battery,
            CMD_EQ => Command::Eq,
            CMD_ALARM => Command::Alarm,
            CMD_TRACK => Command::Track,
            CMD_PLAY_STATE => Command::PlayState,
            CMD_DISPLAY => Command::Display,
            CMD_TEXT => Command::Text,
            CMD_SYNC_GET_ADDR => Command::SyncGetAddr,
            CMD_SYNC_TRACK_COUNT => Command::SyncTrackCount,
            CMD_SYNC_SET_TRACK => Command::SyncSetTrack,
            other => return Err(other),
        })
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> u8 {
        match command {
            Command::Capabilities => CMD_CAPABILITIES,
            Command::DisplayMode => CMD_DISPLAY_MODE,
            Command::Backlight => CMD_BACKLIGHT,
            Command::Volume => CMD_VOLUME,
            Command::PlayMode => CMD_PLAY_MODE,
            Command::RecMode => CMD_REC_MODE,
            Command::Battery => CMD_BATTERY,
            Command::Eq => CMD_EQ,
            Command::Alarm => CMD_ALARM,
            Command::Track => CMD_TRACK,
            Command::PlayState => CMD_PLAY_STATE,
            Command::Display => CMD_DISPLAY,
            Command::Text => CMD_TEXT,
            Command::SyncGetAddr => CMD_SYNC_GET_ADDR,
            Command::SyncTrackCount => CMD_SYNC_TRACK_COUNT,
            Command::SyncSetTrack => CMD_SYNC_SET_TRACK,
        }
    }
}

impl Command {
    /// Payload index of the value this command carries, if it carries one.
    pub fn register_index(self) -> Option<usize> {
        match self {
            Command::Backlight
            | Command::Volume
            | Command::PlayMode
            | Command::RecMode
            | Command::Battery
            | Command::Eq
            | Command::Alarm => Some(REG_VALUE),
            Command::Track => Some(REG_TRACK),
            Command::PlayState => Some(REG_PLAY_STATE),
            _ => None,
        }
    }

    /// Builds the payload that sets this register to `value`.
    pub fn payload(self, value: u8) -> Option<[u8; PAYLOAD_LEN]> {
        let index = self.register_index()?;
        let mut payload = [0; PAYLOAD_LEN];
        payload[0] = self.into();
        payload[index] = value;
        Some(payload)
    }
}

/// Decodes the BCD track register.
pub fn track_from_register(register: u8) -> u8 {
    (register >> 4) * 10 + (register & 0x0F)
}

/// Encodes a track number (0..=99) as the BCD track register.
pub fn track_to_register(track: u8) -> u8 {
    ((track / 10) << 4) | (track % 10)
}

/// The reply to a capability request for `block`.
///
/// Blocks the remote does not know about get no reply.
pub fn capability_block(block: u8) -> Option<[u8; PAYLOAD_LEN]> {
    let body: [u8; PAYLOAD_LEN - 2] = match block {
        1 => [0xFF, 0x00, 0x00, 6, 12, 0x80, 0x00, 0x23],
        2 => [0xFF, 0x00, 0x00, 0x0F, 6, 12, 0x80, 0x23],
        5 => [b'R', b'M', b'-', b'5', b'5', b'G', 0, 0],
        6 => [b'M', b'D', b' ', b' ', 0, 0, 0, 0],
        _ => return None,
    };
    let mut reply = [0; PAYLOAD_LEN];
    reply[0] = CAPABILITY_REMOTE;
    reply[1] = block;
    reply[2..].copy_from_slice(&body);
    Some(reply)
}

/// Payload requesting capability `block` from the remote.
pub fn capability_request(block: u8) -> [u8; PAYLOAD_LEN] {
    let mut payload = [0; PAYLOAD_LEN];
    payload[0] = CMD_CAPABILITIES;
    payload[REG_CAPABILITIES_BLOCK] = block;
    payload
}

/// Last raw value received for each register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct RegisterMap {
    backlight: u8,
    volume: u8,
    play_mode: u8,
    rec_mode: u8,
    battery: u8,
    eq: u8,
    alarm: u8,
    track: u8,
    play_state: u8,
}

impl RegisterMap {
    /// An all-zero map.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, command: Command) -> Option<&mut u8> {
        Some(match command {
            Command::Backlight => &mut self.backlight,
            Command::Volume => &mut self.volume,
            Command::PlayMode => &mut self.play_mode,
            Command::RecMode => &mut self.rec_mode,
            Command::Battery => &mut self.battery,
            Command::Eq => &mut self.eq,
            Command::Alarm => &mut self.alarm,
            Command::Track => &mut self.track,
            Command::PlayState => &mut self.play_state,
            _ => return None,
        })
    }

    /// Stores the register carried by `payload`.
    ///
    /// Returns `true` if the stored value changed.
    pub fn apply(&mut self, command: Command, payload: &[u8; PAYLOAD_LEN]) -> bool {
        let Some(index) = command.register_index() else {
            return false;
        };
        let value = payload[index];
        match self.slot(command) {
            Some(slot) if *slot != value => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    /// Raw value of `command`'s register.
    pub fn raw(&self, command: Command) -> Option<u8> {
        let mut copy = *self;
        copy.slot(command).map(|slot| *slot)
    }

    /// Track number.
    pub fn track(&self) -> u8 {
        track_from_register(self.track)
    }

    /// Volume level.
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Raw play mode.
    pub fn play_mode(&self) -> u8 {
        self.play_mode
    }

    /// Raw play state.
    pub fn play_state(&self) -> u8 {
        self.play_state
    }

    /// Raw equaliser setting.
    pub fn eq(&self) -> u8 {
        self.eq
    }

    /// Returns `true` if the backlight is on.
    pub fn backlight_on(&self) -> bool {
        self.backlight == INDICATOR_ON
    }

    /// Returns `true` if the recording indicator is lit.
    pub fn recording(&self) -> bool {
        self.rec_mode == INDICATOR_ON
    }

    /// Returns `true` if the alarm indicator is lit.
    pub fn alarm(&self) -> bool {
        self.alarm == INDICATOR_ON
    }

    /// Returns `true` while the battery charges.
    pub fn battery_charging(&self) -> bool {
        self.battery == BATTERY_CHARGE
    }

    /// Returns `true` if the battery is low.
    pub fn battery_low(&self) -> bool {
        self.battery == BATTERY_LOW
    }

    /// Battery bars, `0` while charging, low or empty.
    pub fn battery_level(&self) -> u8 {
        match self.battery {
            BATTERY_CHARGE | BATTERY_LOW | BATTERY_ZERO => 0,
            raw => ((raw >> 5) & 0xFB) + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_register_is_bcd() {
        let payload = [0xA0, 0, 0, 0x12, 0, 0, 0, 0, 0, 0];
        let mut registers = RegisterMap::new();
        assert!(registers.apply(Command::Track, &payload));
        assert_eq!(registers.track(), 12);
        assert_eq!(track_to_register(12), 0x12);
        assert_eq!(Command::Track.payload(track_to_register(12)), Some(payload));
    }

    #[test]
    fn test_apply_reports_changes_only() {
        let mut registers = RegisterMap::new();
        let payload = Command::Volume.payload(20).unwrap();
        assert!(registers.apply(Command::Volume, &payload));
        assert!(!registers.apply(Command::Volume, &payload));
        assert_eq!(registers.volume(), 20);
        assert_eq!(registers.raw(Command::Volume), Some(20));
        assert_eq!(registers.raw(Command::Text), None);
    }

    #[test]
    fn test_command_ids_round_trip() {
        for id in 0..=u8::MAX {
            if let Ok(command) = Command::try_from(id) {
                assert_eq!(u8::from(command), id);
            }
        }
        assert_eq!(Command::try_from(0x02), Err(0x02));
    }

    #[test]
    fn test_capability_blocks() {
        let serial = capability_block(5).unwrap();
        assert_eq!(&serial[..8], &[0xC0, 5, b'R', b'M', b'-', b'5', b'5', b'G']);
        assert_eq!(
            capability_block(1),
            Some([0xC0, 1, 0xFF, 0, 0, 6, 12, 0x80, 0, 0x23])
        );
        assert!(capability_block(3).is_none());
        assert_eq!(capability_request(2)[REG_CAPABILITIES_BLOCK], 2);
    }

    #[test]
    fn test_battery_level() {
        let mut registers = RegisterMap::new();
        let _ = registers.apply(Command::Battery, &Command::Battery.payload(0x60).unwrap());
        assert_eq!(registers.battery_level(), 4);
        let _ = registers.apply(Command::Battery, &Command::Battery.payload(BATTERY_CHARGE).unwrap());
        assert!(registers.battery_charging());
        assert_eq!(registers.battery_level(), 0);
    }
}
