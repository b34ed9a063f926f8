//! Outbound status line.
//!
//! ```text
//! $STS,<limit>,<pan>,<tilt>,<aux>,<light>,<flags>,<diag>,<valve_open>,<valve_enabled>,<valve_ms>\n
//! ```
//!
//! Angles carry one decimal place; everything else is an integer, which
//! bounds the line well under [`STATUS_MAX_LEN`].

use core::fmt::Write;

use heapless::String;

use crate::config::NUM_HEAD_SERVOS;
use crate::state::device::LimitDirection;

/// Capacity of an encoded status line.
pub const STATUS_MAX_LEN: usize = 96;

/// Status bit: at least one servo is still travelling.
pub const STATUS_MOVING: u8 = 0x01;
/// Status bit: a receive overflow happened since the last status line.
pub const STATUS_RX_OVERFLOW: u8 = 0x02;
/// Status bit: the valve max-open trip is latched.
pub const STATUS_VALVE_TRIPPED: u8 = 0x04;

pub type StatusLine = String<STATUS_MAX_LEN>;

/// Everything the status line reports, copied out under the state lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusSnapshot {
    pub limit: LimitDirection,
    pub head_angles: [f32; NUM_HEAD_SERVOS],
    pub light_on: bool,
    pub flags: u8,
    pub diagnostic_active: bool,
    pub valve_open: bool,
    pub valve_enabled: bool,
    pub valve_open_ms: u64,
}

/// Encode one status line, terminator included.
///
/// Returns `None` only if the line would not fit in [`STATUS_MAX_LEN`].
pub fn encode_status(s: &StatusSnapshot) -> Option<StatusLine> {
    let mut line = StatusLine::new();
    write!(line, "$STS,{}", s.limit.code()).ok()?;
    for angle in s.head_angles {
        write!(line, ",{:.1}", angle).ok()?;
    }
    write!(
        line,
        ",{},{},{},{},{},{}\n",
        u8::from(s.light_on),
        s.flags,
        u8::from(s.diagnostic_active),
        u8::from(s.valve_open),
        u8::from(s.valve_enabled),
        s.valve_open_ms,
    )
    .ok()?;
    Some(line)
}
