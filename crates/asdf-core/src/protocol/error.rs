//! Protocol errors

use thiserror::Error;

/// Errors produced while encoding commands or decoding response frames
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    #[error("Unknown response code: {0:#04x}")]
    UnknownResponseCode(u8),

    #[error("Unexpected response: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedResponse { expected: u8, actual: u8 },
}

/// Errors that can occur while executing one command exchange
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Timed out waiting for reset acknowledgement")]
    ResetTimeout,

    #[error("Timed out waiting for poll frame")]
    PollTimeout,

    #[error("Timed out waiting for response")]
    ResponseTimeout,
}

impl SessionError {
    /// Check if this error is one of the timeout kinds
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SessionError::ResetTimeout | SessionError::PollTimeout | SessionError::ResponseTimeout
        )
    }
}
