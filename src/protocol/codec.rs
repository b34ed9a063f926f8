//! Line framing for the serial protocol.
//!
//! Wire format:
//! ```text
//! ┌─────┬─────┬───┬──────────────────────┬────┐
//! │ '$' │ TAG │ , │ field,field,...      │ \n │
//! └─────┴─────┴───┴──────────────────────┴────┘
//! ```
//!
//! The receiver is fed one byte at a time and hands out complete lines
//! (start marker included, terminator stripped). A start marker always
//! restarts the line, so a truncated line followed by a fresh one
//! resynchronises on its own.

/// Every line starts with this byte.
pub const START_MARKER: u8 = b'$';
/// Every line ends with this byte.
pub const TERMINATOR: u8 = b'\n';
/// Longest accepted line, terminator excluded.
pub const MAX_LINE_LEN: usize = 64;

/// Receiver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Waiting for a start marker; everything else is noise.
    Idle,
    /// Recording a line.
    Recording,
}

/// Streaming line receiver.
pub struct LineReceiver {
    state: RxState,
    buf: [u8; MAX_LINE_LEN],
    len: usize,
    overflowed: bool,
}

impl Default for LineReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl LineReceiver {
    pub fn new() -> Self {
        Self {
            state: RxState::Idle,
            buf: [0; MAX_LINE_LEN],
            len: 0,
            overflowed: false,
        }
    }

    /// Feed one byte.
    ///
    /// Returns `Some(line)` when a complete line is available. The slice
    /// is valid until the next call to `push`.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        match (byte, self.state) {
            (START_MARKER, _) => {
                self.buf[0] = START_MARKER;
                self.len = 1;
                self.state = RxState::Recording;
                None
            }
            (TERMINATOR, RxState::Recording) => {
                self.state = RxState::Idle;
                let len = core::mem::take(&mut self.len);
                // Marker plus at least one byte.
                if len >= 2 {
                    Some(&self.buf[..len])
                } else {
                    None
                }
            }
            (_, RxState::Idle) => None,
            (_, RxState::Recording) => {
                if self.len < MAX_LINE_LEN {
                    self.buf[self.len] = byte;
                    self.len += 1;
                } else {
                    self.overflowed = true;
                    self.reset();
                }
                None
            }
        }
    }

    /// Whether an overflow happened since the last call; clears the flag.
    pub fn take_overflow(&mut self) -> bool {
        core::mem::take(&mut self.overflowed)
    }

    /// Drop any partial line (e.g. after a transport reconnect).
    pub fn reset(&mut self) {
        self.state = RxState::Idle;
        self.len = 0;
    }
}
