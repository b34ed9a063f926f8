//! Communication task (~30 Hz).
//!
//! Per cycle:
//! 1. Drain the transport through the line receiver and decode every
//!    complete line. Decoding happens outside the state lock.
//! 2. Under one lock: apply the decoded commands in arrival order, run
//!    the connection-timeout check, and copy out a status snapshot if a
//!    status line is due.
//! 3. Outside the lock: emit events and write the status line.
//!
//! If the lock cannot be taken in time, decoded commands stay queued for
//! the next cycle.

use std::sync::Arc;
use std::time::Duration;

use burster::Limiter;
use heapless::Vec;
use log::warn;

use crate::adapters::time::platform_now;
use crate::config::SystemConfig;
use crate::protocol::codec::LineReceiver;
use crate::protocol::packet::{Command, decode};
use crate::protocol::status::{STATUS_RX_OVERFLOW, StatusSnapshot, encode_status};
use crate::protocol::transport::Transport;
use crate::scheduler::PeriodicTask;
use crate::state::device::LinkChange;
use crate::state::{Applied, StateStore};

use super::events::AppEvent;
use super::ports::EventSink;

const TASK_NAME: &str = "comm";

/// Decoded commands waiting for the state lock.
pub const PENDING_CAPACITY: usize = 16;

/// Bytes read from the transport per call. Every byte can at most
/// complete one line, so a chunk never yields more commands than this.
const RX_CHUNK: usize = 8;

/// Malformed-packet style warnings allowed per second (and burst size).
const NOISY_EVENTS_PER_SEC: u64 = 10;

/// What one locked section produced.
struct Exchange {
    applied: Vec<(Applied, u64), PENDING_CAPACITY>,
    link_check: Option<LinkChange>,
    status: Option<StatusSnapshot>,
}

pub struct CommTask<T: Transport, S: EventSink> {
    store: Arc<StateStore>,
    transport: T,
    events: S,
    receiver: LineReceiver,
    pending: Vec<Command, PENDING_CAPACITY>,
    noisy_events: burster::TokenBucket<fn() -> Duration>,
    period_ms: u64,
    status_interval_ms: u64,
    connection_timeout_ms: u64,
    /// When the next status line is due; `None` until the first one.
    next_status_at: Option<u64>,
    /// Receive overflow since the last status line went out.
    rx_overflow: bool,
}

impl<T: Transport, S: EventSink> CommTask<T, S> {
    pub fn new(store: Arc<StateStore>, transport: T, events: S, config: &SystemConfig) -> Self {
        Self {
            store,
            transport,
            events,
            receiver: LineReceiver::new(),
            pending: Vec::new(),
            noisy_events: burster::TokenBucket::new_with_time_provider(
                NOISY_EVENTS_PER_SEC,
                NOISY_EVENTS_PER_SEC,
                platform_now as fn() -> Duration,
            ),
            period_ms: u64::from(config.comm_period_ms),
            status_interval_ms: u64::from(config.status_interval_ms),
            connection_timeout_ms: u64::from(config.connection_timeout_ms),
            next_status_at: None,
            rx_overflow: false,
        }
    }

    /// One communication cycle at `now_ms`.
    pub fn step(&mut self, now_ms: u64) {
        self.drain_transport();

        let status_due = self.next_status_at.is_none_or(|due| now_ms >= due);
        let pending = &self.pending;
        let timeout_ms = self.connection_timeout_ms;

        let exchange = self.store.with_exclusive(|shared| {
            let mut applied = Vec::new();
            for command in pending {
                let outcome = shared.apply(command, now_ms);
                let open_ms = shared.valve.state().accumulated_open_ms;
                // Same capacity as `pending`.
                let _ = applied.push((outcome, open_ms));
            }
            let link_check = shared.device.check_connection(now_ms, timeout_ms);
            let status = (status_due && shared.device.command.connected)
                .then(|| shared.status_snapshot());
            Exchange {
                applied,
                link_check,
                status,
            }
        });

        let exchange = match exchange {
            Ok(exchange) => exchange,
            Err(cause) => {
                self.events.emit(&AppEvent::CycleSkipped {
                    task: TASK_NAME,
                    cause,
                });
                return;
            }
        };
        self.pending.clear();

        for (applied, open_ms) in &exchange.applied {
            self.report(applied, *open_ms);
        }
        if let Some(change) = exchange.link_check {
            self.events.emit(&AppEvent::link(change));
        }
        if let Some(mut snapshot) = exchange.status {
            if self.rx_overflow {
                snapshot.flags |= STATUS_RX_OVERFLOW;
            }
            self.send_status(&snapshot, now_ms);
        }
    }

    /// Commands decoded but not yet applied.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn events(&self) -> &S {
        &self.events
    }

    // ── Internal ──────────────────────────────────────────────────

    fn drain_transport(&mut self) {
        let mut chunk = [0u8; RX_CHUNK];
        // Stop while a full chunk could overfill the queue; the rest
        // stays in the driver buffer until next cycle.
        while self.pending.len() + RX_CHUNK <= PENDING_CAPACITY {
            let n = match self.transport.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("RX | transport read failed: {:?}", e);
                    break;
                }
            };
            for &byte in &chunk[..n] {
                self.receive_byte(byte);
            }
        }
    }

    fn receive_byte(&mut self, byte: u8) {
        let decoded = self.receiver.push(byte).map(decode);
        if self.receiver.take_overflow() {
            self.rx_overflow = true;
            self.emit_noisy(AppEvent::RxOverflow);
        }
        match decoded {
            Some(Ok(command)) => {
                if self.pending.push(command).is_err() {
                    warn!("RX | command queue full, {:?} dropped", command.kind());
                }
            }
            Some(Err(e)) => self.emit_noisy(AppEvent::MalformedPacket(e)),
            None => {}
        }
    }

    fn report(&mut self, applied: &Applied, open_ms: u64) {
        if let Some(change) = applied.link {
            self.events.emit(&AppEvent::link(change));
        }
        if let Some(engaged) = applied.emergency_stop {
            self.events.emit(&AppEvent::EmergencyStop { engaged });
        }
        if let Some(transition) = applied.valve {
            self.events.emit(&AppEvent::valve(transition, open_ms));
        }
        if applied.trip_acknowledged {
            self.events.emit(&AppEvent::ValveTripAcknowledged);
        }
    }

    fn send_status(&mut self, snapshot: &StatusSnapshot, now_ms: u64) {
        self.next_status_at = Some(next_status_deadline(
            self.next_status_at,
            now_ms,
            self.status_interval_ms,
        ));
        self.rx_overflow = false;

        let Some(line) = encode_status(snapshot) else {
            warn!("TX | status line does not fit, skipped");
            return;
        };
        let sent = self
            .transport
            .write(line.as_bytes())
            .and_then(|n| self.transport.flush().map(|()| n));
        if !matches!(sent, Ok(n) if n == line.len()) {
            self.emit_noisy(AppEvent::TxFailed);
        }
    }

    /// Emit an event that a misbehaving peer could trigger every byte.
    fn emit_noisy(&mut self, event: AppEvent) {
        if self.noisy_events.try_consume(1).is_ok() {
            self.events.emit(&event);
        }
    }
}

/// Deadline after a status line sent at `now_ms`.
///
/// Deadlines sit on a fixed grid so the average rate is the configured
/// one even when the task period does not divide the interval. After a
/// gap of a whole interval or more the grid restarts at `now_ms`.
fn next_status_deadline(due: Option<u64>, now_ms: u64, interval_ms: u64) -> u64 {
    match due {
        Some(due) if now_ms < due + interval_ms => due + interval_ms,
        _ => now_ms + interval_ms,
    }
}

impl<T, S> PeriodicTask for CommTask<T, S>
where
    T: Transport + Send,
    S: EventSink + Send,
{
    fn name(&self) -> &'static str {
        TASK_NAME
    }

    fn period_ms(&self) -> u64 {
        self.period_ms
    }

    fn run_cycle(&mut self, now_ms: u64) {
        self.step(now_ms);
    }
}
