//! Device lifecycle
//!
//! The [`DeviceController`] owns the transport, drives the session and
//! tracks whether the device may accept commands.
//!
//! ```text
//! Uninitialized --reset--> Resetting --ResetDone--> Ready
//! Ready --poll/release/configure--> Ready
//! any --timeout/decode error--> Faulted --reset--> Resetting
//! ```

mod config;

pub use config::DeviceConfig;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::protocol::{
    Command, LeverMask, PollReading, ProtocolError, Response, ResponseCode, SerialTransport,
    Session, SessionError, SessionStats, Transport,
};

/// Lifecycle state of the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceState {
    /// No reset issued yet
    Uninitialized,
    /// Reset sent, waiting for the firmware to come back
    Resetting,
    /// Accepting commands
    Ready,
    /// Last exchange failed; only a reset recovers
    Faulted(String),
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Uninitialized => f.write_str("uninitialized"),
            DeviceState::Resetting => f.write_str("resetting"),
            DeviceState::Ready => f.write_str("ready"),
            DeviceState::Faulted(reason) => write!(f, "faulted ({})", reason),
        }
    }
}

/// Errors surfaced by device operations
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Device not ready (state: {0})")]
    NotReady(DeviceState),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid device configuration: {0}")]
    Config(String),
}

impl From<ProtocolError> for DeviceError {
    fn from(err: ProtocolError) -> Self {
        DeviceError::Session(err.into())
    }
}

/// Timeouts applied per command kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timeouts {
    poll: Duration,
    response: Duration,
    reset: Duration,
}

/// Throttle quadrant controller
#[derive(Debug)]
pub struct DeviceController<T: Transport> {
    transport: T,
    session: Session,
    state: DeviceState,
    timeouts: Timeouts,
}

impl DeviceController<SerialTransport> {
    /// Open the serial port named in `config`; the device still needs a reset
    pub fn open(config: &DeviceConfig) -> Result<Self, DeviceError> {
        config.validate()?;
        let transport = SerialTransport::open(&config.port_name, config.baud_rate)
            .map_err(SessionError::from)?;
        info!(
            "opened {} at {} baud ({:?} poll frames)",
            config.port_name, config.baud_rate, config.poll_format
        );
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> DeviceController<T> {
    /// Wrap an already open transport; `config` supplies framing and timing
    pub fn new(transport: T, config: &DeviceConfig) -> Self {
        Self {
            transport,
            session: config.session(),
            state: DeviceState::Uninitialized,
            timeouts: Timeouts {
                poll: config.poll_timeout(),
                response: config.response_timeout(),
                reset: config.reset_timeout(),
            },
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == DeviceState::Ready
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Reboot the device and wait for it to report ready
    pub fn reset(&mut self) -> Result<(), DeviceError> {
        info!("resetting device (was {})", self.state);
        self.state = DeviceState::Resetting;

        self.run(Command::Reset, self.timeouts.reset)?;

        self.state = DeviceState::Ready;
        info!("device reset complete");
        Ok(())
    }

    /// Reset unless the device is already ready
    pub fn recover(&mut self) -> Result<(), DeviceError> {
        if self.is_ready() {
            return Ok(());
        }
        warn!("recovering device from state {}", self.state);
        self.reset()
    }

    /// Read the current lever positions
    pub fn poll(&mut self) -> Result<PollReading, DeviceError> {
        self.require_ready()?;
        match self.run(Command::Poll, self.timeouts.poll)? {
            Response::Poll(reading) => Ok(reading),
            other => Err(self.unexpected(ResponseCode::PollOk, &other)),
        }
    }

    /// Release the motorized levers
    pub fn release(&mut self) -> Result<ResponseCode, DeviceError> {
        self.require_ready()?;
        let response = self.run(Command::LeverRelease, self.timeouts.response)?;
        self.expect_code(
            &response,
            &[ResponseCode::ReleaseResp, ResponseCode::ReleasePilot],
        )
    }

    /// Drive the levers selected by `mask` to `values`
    pub fn configure(&mut self, mask: LeverMask, values: &[i32]) -> Result<(), DeviceError> {
        self.require_ready()?;
        let command = Command::LeverSet {
            mask,
            values: values.to_vec(),
        };
        let response = self.run(command, self.timeouts.response)?;
        self.expect_code(&response, &[ResponseCode::Ack])?;
        Ok(())
    }

    /// Debug ping; any response code is accepted
    pub fn diagnostic(&mut self) -> Result<ResponseCode, DeviceError> {
        self.require_ready()?;
        match self.run(Command::Diagnostic, self.timeouts.response)? {
            Response::Code(code) => Ok(code),
            other => Err(self.unexpected(ResponseCode::Ack, &other)),
        }
    }

    /// Close the transport; the next reset reopens it
    pub fn close(&mut self) {
        self.transport.close();
        self.state = DeviceState::Uninitialized;
        info!("device closed");
    }

    fn require_ready(&self) -> Result<(), DeviceError> {
        if self.state != DeviceState::Ready {
            return Err(DeviceError::NotReady(self.state.clone()));
        }
        Ok(())
    }

    fn run(&mut self, command: Command, timeout: Duration) -> Result<Response, DeviceError> {
        match self.session.execute(&mut self.transport, &command, timeout) {
            Ok(response) => Ok(response),
            Err(err) => {
                warn!("{} failed: {}", command.name(), err);
                self.state = DeviceState::Faulted(err.to_string());
                Err(err.into())
            }
        }
    }

    fn expect_code(
        &mut self,
        response: &Response,
        accepted: &[ResponseCode],
    ) -> Result<ResponseCode, DeviceError> {
        match response {
            Response::Code(code) if accepted.contains(code) => Ok(*code),
            other => Err(self.unexpected(accepted[0], other)),
        }
    }

    fn unexpected(&mut self, expected: ResponseCode, response: &Response) -> DeviceError {
        let actual = match response {
            Response::ResetDone => ResponseCode::ResetDone,
            Response::Poll(_) => ResponseCode::PollOk,
            Response::Code(code) => *code,
        };
        let err = ProtocolError::UnexpectedResponse {
            expected: expected.as_byte(),
            actual: actual.as_byte(),
        };
        warn!("device answered {}: {}", actual, err);
        self.state = DeviceState::Faulted(err.to_string());
        err.into()
    }
}

impl<T: Transport> Drop for DeviceController<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(DeviceState::Ready.to_string(), "ready");
        assert_eq!(
            DeviceState::Faulted("Timed out".to_string()).to_string(),
            "faulted (Timed out)"
        );
    }

    #[test]
    fn test_not_ready_display() {
        let err = DeviceError::NotReady(DeviceState::Uninitialized);
        assert_eq!(err.to_string(), "Device not ready (state: uninitialized)");
    }
}
