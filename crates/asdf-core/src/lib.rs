//! # ASDF Core Library
//!
//! Host-side driver for the ASDF throttle quadrant.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Command encoding and response frame decoding
//! - Timed command/response exchanges over a serial transport
//! - Device lifecycle management (reset, poll, release, configure)
//! - A simulated device for running without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use asdf_core::device::{DeviceConfig, DeviceController};
//!
//! let config = DeviceConfig::for_port("/dev/ttyACM0");
//! let mut device = DeviceController::open(&config)?;
//! device.reset()?;
//!
//! let reading = device.poll()?;
//! println!("{:?} at {:?}", reading.sample, reading.rate);
//! ```

pub mod demo;
pub mod device;
pub mod levers;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::demo::SimulatedDevice;
    pub use crate::device::{DeviceConfig, DeviceController, DeviceError, DeviceState};
    pub use crate::levers::{Button, LeverReport};
    pub use crate::protocol::{
        Command, LeverMask, PollFormat, PollRate, PollReading, PollSample, ProtocolError,
        Response, ResponseCode, SerialTransport, Session, SessionError, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
