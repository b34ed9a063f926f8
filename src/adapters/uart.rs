//! UART transport to the vision host.
//!
//! Wraps an ESP-IDF `UartDriver` behind [`Transport`]. Reads never block;
//! the communication task polls every cycle. Writes block only until the
//! bytes are in the driver's TX ring buffer.

use esp_idf_hal::delay::{NON_BLOCK, TickType};
use esp_idf_hal::uart::UartDriver;
use esp_idf_sys::EspError;

use crate::protocol::transport::Transport;

/// Longest wait for the TX FIFO to drain on flush.
const FLUSH_TIMEOUT_MS: u64 = 10;

pub struct UartTransport<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }
}

impl Transport for UartTransport<'_> {
    type Error = EspError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
        self.uart.read(buf, NON_BLOCK)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
        self.uart.write(data)
    }

    fn flush(&mut self) -> Result<(), EspError> {
        let ticks = TickType::new_millis(FLUSH_TIMEOUT_MS).ticks();
        self.uart.wait_tx_done(ticks)
    }

    fn available(&self) -> bool {
        self.uart.remaining_read().is_ok_and(|n| n > 0)
    }
}
