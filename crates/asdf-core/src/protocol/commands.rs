//! Protocol commands
//!
//! Defines the commands understood by the throttle quadrant firmware and
//! the response codes it answers with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ProtocolError;

/// Reset the device (firmware reboots and answers `ResetDone`)
pub const CMD_RESET: u8 = 0x80;
/// Poll lever positions and button status
pub const CMD_POLL: u8 = 0x81;
/// Release the motorized levers
pub const CMD_LVR_RELS: u8 = 0x83;
/// Reserved for debugging
pub const CMD_DIAGNOSTIC: u8 = 0xFF;
/// `LeverSet` opcode with no lever selected; the mask lives in bits 6..4
pub const CMD_LVR_SET_EMPTY: u8 = 0x82;

/// `LeverSet` opcode for every 3-bit lever mask
pub const LEVER_SET_OPCODES: [(&str, u8); 8] = [
    ("000", 0x82),
    ("001", 0x92),
    ("010", 0xA2),
    ("011", 0xB2),
    ("100", 0xC2),
    ("101", 0xD2),
    ("110", 0xE2),
    ("111", 0xF2),
];

/// Selects which levers a `LeverSet` command drives.
///
/// Written as three characters ordered (speed brake, throttle 1, throttle 2),
/// e.g. `"011"` drives both throttles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LeverMask(u8);

impl LeverMask {
    /// No lever selected
    pub const NONE: LeverMask = LeverMask(0b000);
    /// Speed brake lever
    pub const SPEED_BRAKE: LeverMask = LeverMask(0b100);
    /// Left throttle lever
    pub const THROTTLE_1: LeverMask = LeverMask(0b010);
    /// Right throttle lever
    pub const THROTTLE_2: LeverMask = LeverMask(0b001);
    /// Both throttle levers
    pub const THROTTLES: LeverMask = LeverMask(0b011);
    /// Every lever
    pub const ALL: LeverMask = LeverMask(0b111);

    /// Build a mask from its low three bits
    pub fn from_bits(bits: u8) -> Result<Self, ProtocolError> {
        if bits > 0b111 {
            return Err(ProtocolError::Encoding(format!(
                "lever mask {:#b} has more than 3 bits",
                bits
            )));
        }
        Ok(Self(bits))
    }

    /// Recover the mask from a `LeverSet` opcode
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        if opcode & 0x8F == CMD_LVR_SET_EMPTY {
            Some(Self((opcode >> 4) & 0b111))
        } else {
            None
        }
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Number of levers selected, i.e. the number of values a `LeverSet` carries
    pub fn lever_count(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(&self, other: LeverMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Opcode sent on the wire for this mask
    pub fn opcode(&self) -> u8 {
        CMD_LVR_SET_EMPTY | (self.0 << 4)
    }
}

impl FromStr for LeverMask {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LEVER_SET_OPCODES
            .iter()
            .position(|(key, _)| *key == s)
            .map(|idx| LeverMask(idx as u8))
            .ok_or_else(|| {
                ProtocolError::Encoding(format!(
                    "invalid lever bitmask {:?}, expected 3 characters of 0/1",
                    s
                ))
            })
    }
}

impl TryFrom<String> for LeverMask {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LeverMask> for String {
    fn from(mask: LeverMask) -> Self {
        mask.to_string()
    }
}

impl fmt::Display for LeverMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03b}", self.0)
    }
}

/// Protocol commands for device communication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Reboot the firmware (0x80)
    Reset,

    /// Read lever positions (0x81)
    Poll,

    /// Let go of the motorized levers (0x83)
    LeverRelease,

    /// Drive the selected levers to the given values
    LeverSet { mask: LeverMask, values: Vec<i32> },

    /// Debug ping (0xFF)
    Diagnostic,
}

impl Command {
    /// Get the opcode byte that starts this command on the wire
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Reset => CMD_RESET,
            Command::Poll => CMD_POLL,
            Command::LeverRelease => CMD_LVR_RELS,
            Command::LeverSet { mask, .. } => mask.opcode(),
            Command::Diagnostic => CMD_DIAGNOSTIC,
        }
    }

    /// Short name used by the debug shell
    pub fn name(&self) -> &'static str {
        match self {
            Command::Reset => "reset",
            Command::Poll => "poll",
            Command::LeverRelease => "lvrrels",
            Command::LeverSet { .. } => "lvrset",
            Command::Diagnostic => "asdf",
        }
    }
}

/// Response codes sent back by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    Error,
    Ack,
    ResetDone,
    PollOk,
    ReleasePilot,
    ReleaseResp,
}

impl ResponseCode {
    pub fn as_byte(&self) -> u8 {
        match self {
            ResponseCode::Error => 0xFF,
            ResponseCode::Ack => 0x00,
            ResponseCode::ResetDone => 0x01,
            ResponseCode::PollOk => 0x02,
            ResponseCode::ReleasePilot => 0x03,
            ResponseCode::ReleaseResp => 0x83,
        }
    }

    /// Human readable description
    pub fn description(&self) -> &'static str {
        match self {
            ResponseCode::Error => "error",
            ResponseCode::Ack => "ack'd",
            ResponseCode::ResetDone => "reset done",
            ResponseCode::PollOk => "poll ok",
            ResponseCode::ReleasePilot => "pilot release lever",
            ResponseCode::ReleaseResp => "release lever done",
        }
    }
}

impl TryFrom<u8> for ResponseCode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0xFF => Ok(ResponseCode::Error),
            0x00 => Ok(ResponseCode::Ack),
            0x01 => Ok(ResponseCode::ResetDone),
            0x02 => Ok(ResponseCode::PollOk),
            0x03 => Ok(ResponseCode::ReleasePilot),
            0x83 => Ok(ResponseCode::ReleaseResp),
            other => Err(ProtocolError::UnknownResponseCode(other)),
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_opcodes() {
        assert_eq!(Command::Reset.opcode(), 0x80);
        assert_eq!(Command::Poll.opcode(), 0x81);
        assert_eq!(Command::LeverRelease.opcode(), 0x83);
        assert_eq!(Command::Diagnostic.opcode(), 0xFF);
    }

    #[test]
    fn test_mask_opcode_matches_table() {
        for (key, opcode) in LEVER_SET_OPCODES {
            let mask: LeverMask = key.parse().unwrap();
            assert_eq!(mask.opcode(), opcode, "mask {}", key);
            assert_eq!(mask.to_string(), key);
            assert_eq!(LeverMask::from_opcode(opcode), Some(mask));
        }
    }

    #[test]
    fn test_mask_rejects_bad_strings() {
        for bad in ["", "01", "0011", "012", "abc", " 01"] {
            assert!(
                matches!(bad.parse::<LeverMask>(), Err(ProtocolError::Encoding(_))),
                "{:?} should be rejected",
                bad
            );
        }
        assert!(LeverMask::from_bits(0b1000).is_err());
    }

    #[test]
    fn test_mask_lever_count() {
        assert_eq!(LeverMask::NONE.lever_count(), 0);
        assert_eq!(LeverMask::THROTTLES.lever_count(), 2);
        assert_eq!(LeverMask::ALL.lever_count(), 3);
        assert!(LeverMask::THROTTLES.contains(LeverMask::THROTTLE_1));
        assert!(!LeverMask::THROTTLES.contains(LeverMask::SPEED_BRAKE));
    }

    #[test]
    fn test_from_opcode_ignores_other_commands() {
        assert_eq!(LeverMask::from_opcode(CMD_RESET), None);
        assert_eq!(LeverMask::from_opcode(CMD_POLL), None);
        assert_eq!(LeverMask::from_opcode(CMD_LVR_RELS), None);
        assert_eq!(LeverMask::from_opcode(CMD_DIAGNOSTIC), None);
    }

    #[test]
    fn test_response_code_table() {
        for byte in [0xFF, 0x00, 0x01, 0x02, 0x03, 0x83] {
            let code = ResponseCode::try_from(byte).unwrap();
            assert_eq!(code.as_byte(), byte);
        }
        assert_eq!(
            ResponseCode::try_from(0x42),
            Err(ProtocolError::UnknownResponseCode(0x42))
        );
    }

    #[test]
    fn test_mask_serde_as_string() {
        let json = serde_json::to_string(&LeverMask::THROTTLES).unwrap();
        assert_eq!(json, "\"011\"");
        let back: LeverMask = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LeverMask::THROTTLES);
    }
}
