//! Scripted transport shared by the integration tests

#![allow(dead_code)]

use asdf_core::protocol::Transport;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// Everything the code under test did to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Write(Vec<u8>),
    Close,
    Reopen,
}

/// Mock transport answering each write with the next scripted reply
pub struct MockTransport {
    pub events: Vec<Event>,
    pub rx: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    pub fail_on_write: bool,
    pub short_write: Option<usize>,
    /// Number of upcoming reopens that fail
    pub failing_reopens: usize,
    open: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            rx: VecDeque::new(),
            replies: VecDeque::new(),
            fail_on_write: false,
            short_write: None,
            failing_reopens: 0,
            open: true,
        }
    }

    /// Queue the bytes the device sends after the next write
    pub fn reply(mut self, bytes: &[u8]) -> Self {
        self.replies.push_back(bytes.to_vec());
        self
    }

    /// Bytes already sitting in the receive buffer before any command
    pub fn with_stale(mut self, bytes: &[u8]) -> Self {
        self.rx.extend(bytes.iter().copied());
        self
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Transport for MockTransport {
    fn read_available(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let n = max.min(self.rx.len());
        Ok(self.rx.drain(..n).collect())
    }

    fn read_exact(&mut self, n: usize, _timeout: Duration) -> io::Result<Vec<u8>> {
        if self.rx.len() < n {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "mock timeout"));
        }
        Ok(self.rx.drain(..n).collect())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if !self.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "mock port is closed"));
        }
        if self.fail_on_write {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failed"));
        }
        self.events.push(Event::Write(data.to_vec()));
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply);
        }
        Ok(self.short_write.unwrap_or(data.len()))
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
        self.events.push(Event::Close);
    }

    fn reopen(&mut self) -> io::Result<()> {
        self.events.push(Event::Reopen);
        if self.failing_reopens > 0 {
            self.failing_reopens -= 1;
            return Err(io::Error::new(io::ErrorKind::NotFound, "mock port vanished"));
        }
        self.open = true;
        Ok(())
    }
}

/// Well formed legacy poll frame carrying samples 1..=5
pub fn legacy_frame() -> Vec<u8> {
    vec![
        0x02, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00, 0x05, 0x01, 0xEE, 0xEE,
    ]
}

pub const LEGACY_SAMPLES: [u16; 5] = [1, 2, 3, 4, 0x0105];
