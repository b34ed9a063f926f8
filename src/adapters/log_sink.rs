//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each application event as one
//! `TAG | ...` line to the logger (UART console in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::safety::ForceReason;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { version } => {
                info!("START | animatron v{} tasks running", version);
            }
            AppEvent::LinkEstablished => {
                info!("LINK | peer connected");
            }
            AppEvent::LinkLost { silent_ms } => {
                warn!("LINK | peer lost after {} ms of silence", silent_ms);
            }
            AppEvent::MalformedPacket(e) => {
                warn!("RX | packet rejected: {}", e);
            }
            AppEvent::RxOverflow => {
                warn!("RX | receive buffer overflow, line dropped");
            }
            AppEvent::TxFailed => {
                warn!("TX | status write failed");
            }
            AppEvent::ValveOpened => {
                info!("VALVE | open");
            }
            AppEvent::ValveClosed { open_ms } => {
                info!("VALVE | closed, dispensed for {} ms", open_ms);
            }
            AppEvent::ValveForcedClosed { reason, open_ms } => match reason {
                ForceReason::MaxOpenExceeded => {
                    warn!("VALVE | tripped after {} ms, open refused until ACK", open_ms);
                }
                _ => warn!("VALVE | forced closed ({}) after {} ms", reason, open_ms),
            },
            AppEvent::ValveTripAcknowledged => {
                info!("VALVE | trip acknowledged");
            }
            AppEvent::EmergencyStop { engaged } => {
                if *engaged {
                    warn!("ESTOP | engaged");
                } else {
                    info!("ESTOP | released");
                }
            }
            AppEvent::CycleSkipped { task, cause } => {
                warn!("LOCK | {} skipped a cycle: {}", task, cause);
            }
            AppEvent::DisplayModeChanged(mode) => {
                info!("DISPLAY | dot matrix -> {:?}", mode);
            }
        }
    }
}
