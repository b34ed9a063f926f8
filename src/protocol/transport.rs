//! Transport abstraction, any byte-oriented channel.
//!
//! Production uses the UART link to the vision host
//! ([`UartTransport`](crate::adapters::uart::UartTransport)); tests use an
//! in-memory pipe. The communication task is generic over `Transport`.

/// Byte-oriented transport channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf` without blocking.
    /// Returns 0 if no data is available.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Check if data is available for reading.
    fn available(&self) -> bool;
}
