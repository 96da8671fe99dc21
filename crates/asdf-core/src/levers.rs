//! Lever positions and button state
//!
//! The firmware reports each lever as a 7-bit value (0..=127). The compact
//! poll frame is laid out as `[PollOk, buttons, speed brake, throttle 1,
//! throttle 2]`.

use serde::{Deserialize, Serialize};

use crate::protocol::{PollFormat, ProtocolError, ResponseCode};

/// Largest raw lever value
pub const LEVER_MAX: u8 = 0x7F;

/// Number of throttle levers
pub const THROTTLE_COUNT: usize = 2;

/// Push buttons on the quadrant, by bit index in the button byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Toga = 0,
    AtDisengage = 1,
}

/// One lever/button snapshot decoded from a compact poll frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeverReport {
    /// Button bitmap
    pub buttons: u8,
    pub speed_brake: u8,
    /// Left and right throttle
    pub throttle: [u8; THROTTLE_COUNT],
}

impl LeverReport {
    /// Interpret a raw compact poll frame
    pub fn from_frame(frame: &[u8]) -> Result<Self, ProtocolError> {
        let expected = PollFormat::Compact.frame_len();
        if frame.len() != expected {
            return Err(ProtocolError::FrameLength {
                expected,
                actual: frame.len(),
            });
        }
        if frame[0] != ResponseCode::PollOk.as_byte() {
            return Err(ProtocolError::UnexpectedResponse {
                expected: ResponseCode::PollOk.as_byte(),
                actual: frame[0],
            });
        }

        Ok(Self {
            buttons: frame[1],
            speed_brake: frame[2],
            throttle: [frame[3], frame[4]],
        })
    }

    /// Build the frame the firmware would send for this report
    pub fn to_frame(&self) -> [u8; 5] {
        [
            ResponseCode::PollOk.as_byte(),
            self.buttons,
            self.speed_brake,
            self.throttle[0],
            self.throttle[1],
        ]
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons & (1 << button as u8) != 0
    }

    pub fn speed_brake_percent(&self) -> f64 {
        raw_to_percent(self.speed_brake)
    }

    pub fn throttle_percent(&self) -> [f64; THROTTLE_COUNT] {
        [raw_to_percent(self.throttle[0]), raw_to_percent(self.throttle[1])]
    }
}

/// Map a raw lever value [0, 127] to percent [0, 100]
pub fn raw_to_percent(raw: u8) -> f64 {
    f64::from(raw) * 100.0 / f64::from(LEVER_MAX)
}

/// Map percent [0, 100] to a raw lever value [0, 127], truncating
pub fn percent_to_raw(percent: f64) -> u8 {
    let clamped = if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    };
    ((clamped * f64::from(LEVER_MAX) / 100.0) as u8) & LEVER_MAX
}
