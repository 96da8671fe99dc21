//! Serial port handling
//!
//! Adapts a `serialport` handle to the [`Transport`] trait.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{Transport, DEFAULT_BAUD_RATE};

/// Delay between `bytes_to_read` checks while waiting for a frame
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Time the device needs after the port opens before it accepts commands
const PORT_OPEN_DELAY: Duration = Duration::from_millis(200);

/// Open a serial port with default settings
pub fn open_port(name: &str, baud_rate: Option<u32>) -> io::Result<Box<dyn SerialPort>> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    // Short timeout keeps blocking reads responsive; deadlines are enforced by read_exact
    let mut port = serialport::new(name, baud)
        .timeout(Duration::from_millis(100))
        .open()
        .map_err(io::Error::from)?;
    configure_port(port.as_mut())?;
    Ok(port)
}

/// Configure a serial port for 8N1 without flow control
pub fn configure_port(port: &mut dyn SerialPort) -> io::Result<()> {
    port.set_data_bits(serialport::DataBits::Eight)?;
    port.set_parity(serialport::Parity::None)?;
    port.set_stop_bits(serialport::StopBits::One)?;
    port.set_flow_control(serialport::FlowControl::None)?;
    Ok(())
}

/// Serial port wrapper implementing [`Transport`]
#[derive(Debug)]
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    port_name: String,
    baud_rate: u32,
}

impl SerialTransport {
    /// Open `port_name` at `baud_rate` and wait for the device to settle
    pub fn open(port_name: &str, baud_rate: u32) -> io::Result<Self> {
        let mut transport = Self {
            port: None,
            port_name: port_name.to_string(),
            baud_rate,
        };
        transport.reopen()?;
        Ok(transport)
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port is closed"))
    }
}

impl Transport for SerialTransport {
    fn read_available(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let port = self.port()?;
        let available = port.bytes_to_read()? as usize;
        let to_read = available.min(max);
        if to_read == 0 {
            return Ok(Vec::new());
        }
        let mut buffer = vec![0u8; to_read];
        let n = port.read(&mut buffer)?;
        buffer.truncate(n);
        Ok(buffer)
    }

    fn read_exact(&mut self, n: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        let port = self.port()?;
        let start = Instant::now();

        // Only read once the whole frame is buffered so a timeout never leaves half a frame consumed
        loop {
            if port.bytes_to_read()? as usize >= n {
                break;
            }
            if start.elapsed() > timeout {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no {}-byte frame within {}ms", n, timeout.as_millis()),
                ));
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        let mut buffer = vec![0u8; n];
        port.read_exact(&mut buffer)?;
        debug!("serial read {} bytes: {:02x?}", n, buffer);
        Ok(buffer)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(data.len())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port()?.bytes_to_read()? as usize)
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("closed serial port {}", self.port_name);
        }
    }

    fn reopen(&mut self) -> io::Result<()> {
        self.close();
        let port = open_port(&self.port_name, Some(self.baud_rate))?;
        std::thread::sleep(PORT_OPEN_DELAY);
        if let Err(e) = port.clear(serialport::ClearBuffer::Output) {
            warn!("failed to clear output buffer on {}: {}", self.port_name, e);
        }
        debug!("opened serial port {} at {} baud", self.port_name, self.baud_rate);
        self.port = Some(port);
        Ok(())
    }
}
