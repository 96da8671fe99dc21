//! Demo Mode - Simulated throttle quadrant for testing
//!
//! Answers commands the way the firmware does, without a serial port.
//! Unlocked levers drift in a small random walk between polls.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::levers::{Button, LeverReport, LEVER_MAX};
use crate::protocol::commands::{CMD_DIAGNOSTIC, CMD_LVR_RELS, CMD_POLL, CMD_RESET};
use crate::protocol::{LeverMask, PollFormat, ResponseCode, Transport};

/// Byte the simulated firmware leaks right after a reset
const STALE_BYTE: u8 = 0x00;

/// Trailer closing a legacy poll frame
const LEGACY_TRAILER: [u8; 2] = [0x0D, 0x0A];

/// Largest step a free lever moves between two polls
const DRIFT_STEP: i16 = 3;

/// Simulated device implementing [`Transport`]
pub struct SimulatedDevice {
    format: PollFormat,
    open: bool,
    /// Bytes waiting to be read by the host
    rx: VecDeque<u8>,
    /// Every byte the host wrote, in order
    written: Vec<u8>,
    reset_requested: bool,
    stale_after_reset: bool,
    misalign_next_poll: bool,
    /// `LeverSet` opcode whose values have not all arrived yet
    partial_set: Option<(LeverMask, Vec<u8>)>,
    report: LeverReport,
    locked: bool,
    rng: StdRng,
}

impl SimulatedDevice {
    pub fn new(format: PollFormat) -> Self {
        Self::with_rng(format, StdRng::from_entropy())
    }

    /// Deterministic simulator for tests
    pub fn with_seed(format: PollFormat, seed: u64) -> Self {
        Self::with_rng(format, StdRng::seed_from_u64(seed))
    }

    fn with_rng(format: PollFormat, rng: StdRng) -> Self {
        Self {
            format,
            open: true,
            rx: VecDeque::new(),
            written: Vec::new(),
            reset_requested: false,
            stale_after_reset: false,
            misalign_next_poll: false,
            partial_set: None,
            report: LeverReport {
                buttons: 0,
                speed_brake: 0,
                throttle: [20, 20],
            },
            locked: false,
            rng,
        }
    }

    /// Leak one stale byte ahead of the first poll frame after every reset
    pub fn with_stale_byte_after_reset(mut self, enabled: bool) -> Self {
        self.stale_after_reset = enabled;
        self
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn report(&self) -> LeverReport {
        self.report
    }

    /// True while a `LeverSet` holds the levers
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let bit = 1 << button as u8;
        if pressed {
            self.report.buttons |= bit;
        } else {
            self.report.buttons &= !bit;
        }
    }

    fn handle_byte(&mut self, byte: u8) {
        if let Some((mask, mut values)) = self.partial_set.take() {
            values.push(byte & LEVER_MAX);
            if values.len() == mask.lever_count() {
                self.apply_lever_set(mask, &values);
            } else {
                self.partial_set = Some((mask, values));
            }
            return;
        }

        match byte {
            CMD_RESET => self.reset_requested = true,
            CMD_POLL => self.respond_poll(),
            CMD_LVR_RELS => {
                self.locked = false;
                self.rx.push_back(ResponseCode::ReleaseResp.as_byte());
            }
            CMD_DIAGNOSTIC => self.rx.push_back(ResponseCode::Ack.as_byte()),
            other => match LeverMask::from_opcode(other) {
                Some(mask) if mask.lever_count() == 0 => self.apply_lever_set(mask, &[]),
                Some(mask) => self.partial_set = Some((mask, Vec::new())),
                None => self.rx.push_back(ResponseCode::Error.as_byte()),
            },
        }
    }

    fn apply_lever_set(&mut self, mask: LeverMask, values: &[u8]) {
        let mut values = values.iter().copied();
        let targets = [
            (LeverMask::SPEED_BRAKE, 0),
            (LeverMask::THROTTLE_1, 1),
            (LeverMask::THROTTLE_2, 2),
        ];
        for (lever, idx) in targets {
            if !mask.contains(lever) {
                continue;
            }
            if let Some(value) = values.next() {
                match idx {
                    0 => self.report.speed_brake = value,
                    i => self.report.throttle[i - 1] = value,
                }
            }
        }
        self.locked = mask.lever_count() > 0;
        self.rx.push_back(ResponseCode::Ack.as_byte());
    }

    fn respond_poll(&mut self) {
        if !self.locked {
            self.report.speed_brake = self.drift(self.report.speed_brake);
            self.report.throttle[0] = self.drift(self.report.throttle[0]);
            self.report.throttle[1] = self.drift(self.report.throttle[1]);
        }

        if self.misalign_next_poll {
            self.misalign_next_poll = false;
            if self.format == PollFormat::Legacy {
                self.rx.push_back(STALE_BYTE);
            }
        }

        match self.format {
            PollFormat::Compact => self.rx.extend(self.report.to_frame()),
            PollFormat::Legacy => {
                let samples = [
                    u16::from(self.report.speed_brake),
                    u16::from(self.report.throttle[0]),
                    u16::from(self.report.throttle[1]),
                    u16::from(self.report.buttons),
                    0,
                ];
                self.rx.extend([ResponseCode::PollOk.as_byte(), 0x00]);
                for sample in samples {
                    self.rx.extend(sample.to_le_bytes());
                }
                self.rx.extend(LEGACY_TRAILER);
            }
        }
    }

    fn drift(&mut self, value: u8) -> u8 {
        let step = self.rng.gen_range(-DRIFT_STEP..=DRIFT_STEP);
        (i16::from(value) + step).clamp(0, i16::from(LEVER_MAX)) as u8
    }

    fn ensure_open(&self) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "simulated port is closed",
            ));
        }
        Ok(())
    }
}

impl Transport for SimulatedDevice {
    fn read_available(&mut self, max: usize) -> io::Result<Vec<u8>> {
        self.ensure_open()?;
        let n = max.min(self.rx.len());
        Ok(self.rx.drain(..n).collect())
    }

    fn read_exact(&mut self, n: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        self.ensure_open()?;
        if self.rx.len() < n {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("simulated device has no {}-byte reply within {:?}", n, timeout),
            ));
        }
        Ok(self.rx.drain(..n).collect())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.ensure_open()?;
        self.written.extend_from_slice(data);
        for &byte in data {
            self.handle_byte(byte);
        }
        Ok(data.len())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        self.ensure_open()?;
        Ok(self.rx.len())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn reopen(&mut self) -> io::Result<()> {
        self.open = true;
        self.rx.clear();
        self.partial_set = None;
        if self.reset_requested {
            self.reset_requested = false;
            self.locked = false;
            self.misalign_next_poll = self.stale_after_reset;
            self.rx.push_back(ResponseCode::ResetDone.as_byte());
        }
        Ok(())
    }
}
