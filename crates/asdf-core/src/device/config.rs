//! Device configuration
//!
//! Port, framing and timing settings, loadable from a JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use super::DeviceError;
use crate::protocol::{
    PollFormat, Session, DEFAULT_BAUD_RATE, DEFAULT_POLL_TIMEOUT_MS, DEFAULT_RESET_SETTLE_MS,
    DEFAULT_RESET_TIMEOUT_MS, DEFAULT_RESPONSE_TIMEOUT_MS,
};

/// Settings for one device connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port name (e.g. "/dev/ttyACM0" or "COM6")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Poll frame layout spoken by the firmware
    pub poll_format: PollFormat,
    /// Timeout for a poll frame in milliseconds
    pub poll_timeout_ms: u64,
    /// Timeout for single-byte responses in milliseconds
    pub response_timeout_ms: u64,
    /// Timeout for the reset acknowledgement in milliseconds
    pub reset_timeout_ms: u64,
    /// Wait between closing and reopening the port during reset
    pub reset_settle_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_format: PollFormat::default(),
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT_MS,
            reset_settle_ms: DEFAULT_RESET_SETTLE_MS,
        }
    }
}

impl DeviceConfig {
    /// Default settings for `port_name`
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Load settings from a JSON file; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Save settings as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    /// Reject settings no port can be opened with
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.port_name.trim().is_empty() {
            return Err(DeviceError::Config("port name is empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(DeviceError::Config("baud rate must be non-zero".to_string()));
        }
        if self.poll_timeout_ms == 0 || self.response_timeout_ms == 0 || self.reset_timeout_ms == 0
        {
            return Err(DeviceError::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn reset_settle(&self) -> Duration {
        Duration::from_millis(self.reset_settle_ms)
    }

    /// Build a session with this configuration's framing and reset timing
    pub fn session(&self) -> Session {
        Session::new(self.poll_format).with_reset_settle(self.reset_settle())
    }
}
