//! Command session
//!
//! Runs one command/response exchange at a time against a [`Transport`],
//! bounding every blocking read with a timeout and measuring the poll rate.

use serde::{Deserialize, Serialize};
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{
    codec::{self, PollFormat, PollSample},
    Command, ProtocolError, ResponseCode, SessionError, Transport, DEFAULT_RESET_SETTLE_MS,
};

/// Polls per second derived from the round-trip time of one poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PollRate {
    /// Measured rate in polls per second
    Hz(f64),
    /// Elapsed time was too small to measure
    Unavailable,
}

impl PollRate {
    /// Rate for one exchange that took `elapsed_secs` seconds
    pub fn from_secs(elapsed_secs: f64) -> Self {
        if elapsed_secs > 0.0 && elapsed_secs.is_finite() {
            PollRate::Hz(1.0 / elapsed_secs)
        } else {
            PollRate::Unavailable
        }
    }

    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self::from_secs(elapsed.as_secs_f64())
    }

    pub fn hz(&self) -> Option<f64> {
        match self {
            PollRate::Hz(rate) => Some(*rate),
            PollRate::Unavailable => None,
        }
    }
}

/// Result of one poll exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollReading {
    /// Frame exactly as received
    pub frame: Vec<u8>,
    /// Decoded samples
    pub sample: PollSample,
    /// Poll rate for this exchange
    pub rate: PollRate,
}

/// Decoded response to one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    ResetDone,
    Poll(PollReading),
    Code(ResponseCode),
}

/// Cumulative traffic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    /// Stale bytes drained before a command was sent
    pub discarded_bytes: u64,
    /// Exchanges that completed with a decoded response
    pub exchanges: u64,
}

/// Executes commands one at a time
#[derive(Debug, Clone)]
pub struct Session {
    poll_format: PollFormat,
    reset_settle: Duration,
    stats: SessionStats,
}

impl Session {
    pub fn new(poll_format: PollFormat) -> Self {
        Self {
            poll_format,
            reset_settle: Duration::from_millis(DEFAULT_RESET_SETTLE_MS),
            stats: SessionStats::default(),
        }
    }

    /// Set how long to wait between closing and reopening the port on reset
    pub fn with_reset_settle(mut self, settle: Duration) -> Self {
        self.reset_settle = settle;
        self
    }

    pub fn poll_format(&self) -> PollFormat {
        self.poll_format
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Send `command` and wait up to `timeout` for its response
    pub fn execute(
        &mut self,
        transport: &mut dyn Transport,
        command: &Command,
        timeout: Duration,
    ) -> Result<Response, SessionError> {
        let bytes = codec::encode(command)?;

        let response = match command {
            Command::Reset => self.reset(transport, &bytes, timeout)?,
            Command::Poll => self.poll(transport, &bytes, timeout)?,
            Command::LeverRelease | Command::LeverSet { .. } | Command::Diagnostic => {
                self.simple(transport, &bytes, timeout)?
            }
        };

        self.stats.exchanges = self.stats.exchanges.saturating_add(1);
        Ok(response)
    }

    fn reset(
        &mut self,
        transport: &mut dyn Transport,
        bytes: &[u8],
        timeout: Duration,
    ) -> Result<Response, SessionError> {
        // Reopen after an explicit close or a reopen that failed mid-reset
        if !transport.is_open() {
            debug!("reset: transport closed, reopening before sending reset");
            transport.reopen()?;
        }
        self.write(transport, bytes)?;

        // The firmware reboots and drops the link; reconnect before listening
        transport.close();
        if !self.reset_settle.is_zero() {
            debug!(
                "reset: waiting {}ms before reopening transport",
                self.reset_settle.as_millis()
            );
            std::thread::sleep(self.reset_settle);
        }
        transport.reopen()?;

        // Bytes left over from the reconnect may precede ResetDone
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let reply = self.read(transport, 1, remaining, SessionError::ResetTimeout)?;
            let byte = reply[0];
            if byte == ResponseCode::ResetDone.as_byte() {
                return Ok(Response::ResetDone);
            }
            if byte == ResponseCode::Error.as_byte() {
                codec::decode_reset(&reply)?;
            }
            debug!("reset: skipping stray byte {:#04x}", byte);
            self.stats.discarded_bytes = self.stats.discarded_bytes.saturating_add(1);
        }
    }

    fn poll(
        &mut self,
        transport: &mut dyn Transport,
        bytes: &[u8],
        timeout: Duration,
    ) -> Result<Response, SessionError> {
        self.discard_stale(transport)?;

        let frame_len = self.poll_format.frame_len();
        let start = Instant::now();
        self.write(transport, bytes)?;
        let frame = self.read(transport, frame_len, timeout, SessionError::PollTimeout)?;
        let rate = PollRate::from_elapsed(start.elapsed());

        let sample = codec::decode_poll(&frame, self.poll_format)?;
        Ok(Response::Poll(PollReading {
            frame,
            sample,
            rate,
        }))
    }

    fn simple(
        &mut self,
        transport: &mut dyn Transport,
        bytes: &[u8],
        timeout: Duration,
    ) -> Result<Response, SessionError> {
        self.discard_stale(transport)?;
        self.write(transport, bytes)?;
        let reply = self.read(transport, 1, timeout, SessionError::ResponseTimeout)?;
        Ok(Response::Code(codec::decode_simple(&reply)?))
    }

    fn discard_stale(&mut self, transport: &mut dyn Transport) -> Result<(), SessionError> {
        let stale = transport.drain()?;
        if !stale.is_empty() {
            debug!("discarding {} redundant bytes: {:02x?}", stale.len(), stale);
            self.stats.discarded_bytes = self
                .stats
                .discarded_bytes
                .saturating_add(stale.len() as u64);
        }
        Ok(())
    }

    fn write(&mut self, transport: &mut dyn Transport, bytes: &[u8]) -> Result<(), SessionError> {
        debug!("sending {} bytes: {:02x?}", bytes.len(), bytes);
        let written = transport.write(bytes)?;
        self.stats.tx_bytes = self.stats.tx_bytes.saturating_add(written as u64);
        if written != bytes.len() {
            return Err(SessionError::Transport(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("wrote {} of {} bytes", written, bytes.len()),
            )));
        }
        Ok(())
    }

    fn read(
        &mut self,
        transport: &mut dyn Transport,
        n: usize,
        timeout: Duration,
        on_timeout: SessionError,
    ) -> Result<Vec<u8>, SessionError> {
        let frame = match transport.read_exact(n, timeout) {
            Ok(frame) => frame,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Err(on_timeout),
            Err(e) => return Err(SessionError::Transport(e)),
        };
        self.stats.rx_bytes = self.stats.rx_bytes.saturating_add(frame.len() as u64);
        debug!("received {} bytes: {:02x?}", frame.len(), frame);

        if frame.len() != n {
            return Err(ProtocolError::FrameLength {
                expected: n,
                actual: frame.len(),
            }
            .into());
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_from_elapsed() {
        assert_eq!(PollRate::from_secs(0.01), PollRate::Hz(100.0));
        assert_eq!(PollRate::from_secs(0.5).hz(), Some(2.0));
    }

    #[test]
    fn test_rate_zero_elapsed_is_unavailable() {
        assert_eq!(PollRate::from_secs(0.0), PollRate::Unavailable);
        assert_eq!(PollRate::from_elapsed(Duration::ZERO), PollRate::Unavailable);
        assert_eq!(PollRate::from_secs(-1.0).hz(), None);
    }

    #[test]
    fn test_rate_from_duration() {
        let rate = PollRate::from_elapsed(Duration::from_millis(10)).hz().unwrap();
        assert!((rate - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_session_defaults() {
        let session = Session::new(PollFormat::Legacy);
        assert_eq!(session.poll_format(), PollFormat::Legacy);
        assert_eq!(session.stats(), SessionStats::default());
    }
}
