use std::io;
use std::time::Duration;

/// Abstraction for the byte stream connecting the host to the device.
///
/// A blocking read that runs out of time reports
/// [`io::ErrorKind::TimedOut`]; any other error is a transport failure.
pub trait Transport: Send {
    /// Read whatever is buffered, up to `max` bytes, without blocking
    fn read_available(&mut self, max: usize) -> io::Result<Vec<u8>>;

    /// Block until exactly `n` bytes arrived or `timeout` elapsed
    fn read_exact(&mut self, n: usize, timeout: Duration) -> io::Result<Vec<u8>>;

    /// Write bytes, returning how many were accepted
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Get number of bytes available to read
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// True until [`close`](Transport::close) runs or a reopen fails
    fn is_open(&self) -> bool;

    /// Release the underlying channel
    fn close(&mut self);

    /// Open the channel again with the same settings
    fn reopen(&mut self) -> io::Result<()>;

    /// Drop everything currently buffered, returning the discarded bytes
    fn drain(&mut self) -> io::Result<Vec<u8>> {
        let pending = self.bytes_available()?;
        if pending == 0 {
            return Ok(Vec::new());
        }
        self.read_available(pending)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_available(&mut self, max: usize) -> io::Result<Vec<u8>> {
        (**self).read_available(max)
    }

    fn read_exact(&mut self, n: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        (**self).read_exact(n, timeout)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn reopen(&mut self) -> io::Result<()> {
        (**self).reopen()
    }

    fn drain(&mut self) -> io::Result<Vec<u8>> {
        (**self).drain()
    }
}
