//! Serial Protocol Communication
//!
//! Implements the ASDF command/response protocol spoken by the throttle
//! quadrant firmware.
//!
//! Every command is a single opcode byte (plus lever values for `LeverSet`)
//! and every response is a fixed-length frame. Supports both the legacy
//! 14-byte poll frame and the compact 5-byte poll frame.

pub mod codec;
pub mod commands;
mod error;
pub mod serial;
mod session;
mod transport;

pub use codec::{PollFormat, PollSample};
pub use commands::{Command, LeverMask, ResponseCode};
pub use error::{ProtocolError, SessionError};
pub use serial::{open_port, SerialTransport};
pub use session::{PollRate, PollReading, Response, Session, SessionStats};
pub use transport::Transport;

/// Default baud rate for the device
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default timeout for a poll frame in milliseconds
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;

/// Default timeout for single-byte responses in milliseconds
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 500;

/// Default timeout for the reset acknowledgement after the port is reopened
pub const DEFAULT_RESET_TIMEOUT_MS: u64 = 5000;

/// Time the firmware needs to reboot before the port can be reopened
pub const DEFAULT_RESET_SETTLE_MS: u64 = 3000;
