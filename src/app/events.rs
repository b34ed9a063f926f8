//! Outbound application events.
//!
//! The tasks emit these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them: log to
//! serial, forward to a telemetry channel, etc.

use crate::error::{LockTimeout, ProtocolError};
use crate::safety::{ForceReason, ValveTransition};
use crate::state::device::LinkChange;
use crate::state::peripherals::DotMatrixMode;

/// Structured events emitted by the task set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The task set is running.
    Started { version: &'static str },

    /// First valid packet after silence.
    LinkEstablished,

    /// The peer went silent past the connection timeout.
    LinkLost { silent_ms: u64 },

    /// A framed line was rejected.
    MalformedPacket(ProtocolError),

    /// A line overran the receive buffer and was dropped.
    RxOverflow,

    /// Status line could not be written to the transport.
    TxFailed,

    ValveOpened,

    ValveClosed { open_ms: u64 },

    /// The safety monitor closed the valve against the peer's intent.
    ValveForcedClosed { reason: ForceReason, open_ms: u64 },

    /// The operator cleared a latched max-open trip.
    ValveTripAcknowledged,

    /// Emergency stop engaged (`true`) or released (`false`).
    EmergencyStop { engaged: bool },

    /// A task skipped its cycle because the state lock was busy.
    CycleSkipped { task: &'static str, cause: LockTimeout },

    /// The dot-matrix display switched between scroll and pattern mode.
    DisplayModeChanged(DotMatrixMode),
}

impl AppEvent {
    /// Event for a valve transition, given the open time it ended with.
    pub fn valve(transition: ValveTransition, open_ms: u64) -> Self {
        match transition {
            ValveTransition::Opened => Self::ValveOpened,
            ValveTransition::Closed => Self::ValveClosed { open_ms },
            ValveTransition::ForcedClosed(reason) => Self::ValveForcedClosed { reason, open_ms },
        }
    }

    pub fn link(change: LinkChange) -> Self {
        match change {
            LinkChange::Established => Self::LinkEstablished,
            LinkChange::Lost { silent_ms } => Self::LinkLost { silent_ms },
        }
    }
}
