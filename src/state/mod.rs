//! Shared device state.
//!
//! [`SharedState`] bundles the device record and the valve safety monitor;
//! the [`StateStore`] guards both with one bounded lock so a task sees
//! them change together.

pub mod device;
pub mod peripherals;
pub mod store;

pub use device::DeviceState;
pub use store::StateStore;

use crate::config::SystemConfig;
use crate::protocol::packet::Command;
use crate::protocol::status::{STATUS_MOVING, STATUS_VALVE_TRIPPED, StatusSnapshot};
use crate::safety::{ValveSafetyMonitor, ValveTransition};

use device::{FLAG_DIAGNOSTIC, LinkChange, ServoId};

/// Everything behind the state lock.
#[derive(Debug, Clone)]
pub struct SharedState {
    pub device: DeviceState,
    pub valve: ValveSafetyMonitor,
}

/// Side effects of applying one command, reported for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Applied {
    pub link: Option<LinkChange>,
    pub valve: Option<ValveTransition>,
    /// `Some(engaged)` when the emergency stop changed state.
    pub emergency_stop: Option<bool>,
    pub trip_acknowledged: bool,
}

impl SharedState {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            device: DeviceState::new(config),
            valve: ValveSafetyMonitor::new(config),
        }
    }

    /// Write a decoded command into the command section and mark the
    /// peer as live.
    pub fn apply(&mut self, command: &Command, now_ms: u64) -> Applied {
        let mut applied = Applied::default();
        let cmd = &mut self.device.command;

        match *command {
            Command::Legacy {
                pan_target,
                light,
                flags,
            } => {
                cmd.servo_targets[ServoId::Pan] = pan_target;
                cmd.light_mode = light;
                cmd.flags = flags;
            }
            Command::ServoTargets(targets) => {
                for (id, target) in ServoId::HEAD.into_iter().zip(targets) {
                    cmd.servo_targets[id] = target;
                }
            }
            Command::Light(mode) => cmd.light_mode = mode,
            Command::Strip(strip) => cmd.strip = strip,
            Command::Ring(ring) => cmd.ring = ring,
            Command::PixelMatrix(matrix) => cmd.pixel_matrix = matrix,
            Command::DotMatrix(dots) => cmd.dot_matrix = dots,
            Command::Flags(flags) => cmd.flags = flags,
            Command::Valve { open } => cmd.valve_open = open,
            Command::ValveEnable(enabled) => {
                if cmd.valve_enabled != enabled {
                    applied.emergency_stop = Some(!enabled);
                }
                cmd.valve_enabled = enabled;
                if !enabled {
                    // Takes effect now, not at the next control cycle.
                    applied.valve = self.valve.emergency_stop(now_ms);
                }
            }
            Command::AcknowledgeTrip => {
                applied.trip_acknowledged = self.valve.acknowledge_trip();
            }
        }

        if matches!(command, Command::Legacy { .. } | Command::Flags(_))
            && self.device.command.flags & FLAG_DIAGNOSTIC != 0
        {
            self.device.command.diagnostic_requested_at = Some(now_ms);
        }

        applied.link = self.device.on_command_received(now_ms);
        applied
    }

    /// Copy out what the status line reports. The receive-overflow bit is
    /// owned by the communication task and merged in by the caller.
    pub fn status_snapshot(&self) -> StatusSnapshot {
        let out = &self.device.output;
        let valve = self.valve.state();

        let mut flags = 0;
        if out.any_moving() {
            flags |= STATUS_MOVING;
        }
        if valve.safety_triggered {
            flags |= STATUS_VALVE_TRIPPED;
        }

        StatusSnapshot {
            limit: self.device.input.limit,
            head_angles: ServoId::HEAD.map(|id| out.servo_angles[id]),
            light_on: out.light_on,
            flags,
            diagnostic_active: out.diagnostic_active,
            valve_open: valve.actual_open,
            valve_enabled: valve.enabled,
            valve_open_ms: valve.accumulated_open_ms,
        }
    }
}
