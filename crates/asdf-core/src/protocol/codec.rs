//! Frame encoding/decoding
//!
//! Pure translation between [`Command`]s and the bytes on the wire, and
//! between received frames and typed responses.
//!
//! Poll frame formats:
//! - Legacy (14 bytes): 2 header bytes `[0x02, 0x00]`, 5 little-endian
//!   samples, 2 trailer bytes. Right after a reset the device may emit one
//!   stale byte, which shifts the whole frame by one position.
//! - Compact (5 bytes): no header or trailer, sampled pairwise.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Command, ProtocolError, ResponseCode};

/// First two bytes of a correctly aligned legacy poll frame
pub const LEGACY_HEADER: [u8; 2] = [0x02, 0x00];

const LEGACY_FRAME_LEN: usize = 14;
const LEGACY_HEADER_LEN: usize = 2;
const LEGACY_TRAILER_LEN: usize = 2;
const COMPACT_FRAME_LEN: usize = 5;

/// Poll frame layout, chosen by the firmware version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollFormat {
    /// 14-byte frame with header and trailer
    Legacy,
    /// 5-byte frame without framing bytes
    #[default]
    Compact,
}

impl PollFormat {
    /// Total number of bytes in one poll frame
    pub fn frame_len(&self) -> usize {
        match self {
            PollFormat::Legacy => LEGACY_FRAME_LEN,
            PollFormat::Compact => COMPACT_FRAME_LEN,
        }
    }

    /// Number of samples a decoded frame carries
    pub fn sample_count(&self) -> usize {
        match self {
            PollFormat::Legacy => {
                (LEGACY_FRAME_LEN - LEGACY_HEADER_LEN - LEGACY_TRAILER_LEN) / 2
            }
            PollFormat::Compact => COMPACT_FRAME_LEN / 2,
        }
    }
}

impl std::str::FromStr for PollFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(PollFormat::Legacy),
            "compact" => Ok(PollFormat::Compact),
            other => Err(format!("unknown poll format '{}'", other)),
        }
    }
}

/// One decoded poll frame
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PollSample(pub Vec<u16>);

impl PollSample {
    pub fn values(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Largest value a `LeverSet` can carry; each value is one byte on the wire
pub const LEVER_VALUE_MAX: u8 = u8::MAX;

/// Encode a command into the bytes written to the device
pub fn encode(command: &Command) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = vec![command.opcode()];

    if let Command::LeverSet { mask, values } = command {
        if values.len() != mask.lever_count() {
            return Err(ProtocolError::Encoding(format!(
                "lever mask {} selects {} lever(s) but {} value(s) were given",
                mask,
                mask.lever_count(),
                values.len()
            )));
        }
        for &value in values {
            let byte = u8::try_from(value).map_err(|_| {
                ProtocolError::Encoding(format!(
                    "lever value {} is outside 0-{}",
                    value, LEVER_VALUE_MAX
                ))
            })?;
            bytes.push(byte);
        }
    }

    Ok(bytes)
}

/// Look up the `LeverSet` opcode for a 3-character bitmask string
pub fn lever_set_opcode(bitmask: &str) -> Result<u8, ProtocolError> {
    bitmask.parse::<super::LeverMask>().map(|mask| mask.opcode())
}

/// Decode the single byte the device sends once it has rebooted
pub fn decode_reset(bytes: &[u8]) -> Result<(), ProtocolError> {
    let code = single_byte(bytes)?;
    if code != ResponseCode::ResetDone.as_byte() {
        return Err(ProtocolError::UnexpectedResponse {
            expected: ResponseCode::ResetDone.as_byte(),
            actual: code,
        });
    }
    Ok(())
}

/// Decode a poll frame into its samples
pub fn decode_poll(bytes: &[u8], format: PollFormat) -> Result<PollSample, ProtocolError> {
    check_len(bytes, format.frame_len())?;

    match format {
        PollFormat::Legacy => {
            let mut frame = bytes.to_vec();
            if realign_legacy(&mut frame) {
                warn!("decode_poll: legacy frame misaligned, rotated by one byte");
            }
            let body = &frame[LEGACY_HEADER_LEN..frame.len() - LEGACY_TRAILER_LEN];
            Ok(PollSample(read_samples(body)))
        }
        PollFormat::Compact => Ok(PollSample(read_samples(bytes))),
    }
}

/// Decode a single-byte response through the response code table
pub fn decode_simple(bytes: &[u8]) -> Result<ResponseCode, ProtocolError> {
    ResponseCode::try_from(single_byte(bytes)?)
}

/// Undo the one-byte shift seen on legacy frames after a reset.
///
/// Rotates the buffer left once when it does not start with
/// [`LEGACY_HEADER`]. Never rotates more than once. Returns whether the
/// rotation was applied.
pub fn realign_legacy(frame: &mut [u8]) -> bool {
    if frame.len() < 2 || frame[..2] == LEGACY_HEADER {
        return false;
    }
    frame.rotate_left(1);
    true
}

fn read_samples(body: &[u8]) -> Vec<u16> {
    body.chunks_exact(2).map(LittleEndian::read_u16).collect()
}

fn single_byte(bytes: &[u8]) -> Result<u8, ProtocolError> {
    check_len(bytes, 1)?;
    Ok(bytes[0])
}

fn check_len(bytes: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if bytes.len() != expected {
        return Err(ProtocolError::FrameLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}
