//! Control task (100 Hz).
//!
//! ```text
//!  LimitInput ──▶ ┌──────────── one critical section ────────────┐
//!                 │ limit → link check → valve monitor → slew     │ ──▶ ActuatorPort
//!                 │ → light / diagnostic / display mode          │ ──▶ EventSink
//!                 └──────────────────────────────────────────────┘
//! ```
//!
//! Sensors are sampled before the lock and actuators are written after
//! it; the critical section itself only touches memory.

use std::sync::Arc;

use crate::config::SystemConfig;
use crate::control::slew::{is_moving, move_toward};
use crate::safety::{ValveInputs, ValveTransition};
use crate::scheduler::PeriodicTask;
use crate::state::device::{LimitDirection, LinkChange, ServoArray, ServoId};
use crate::state::peripherals::DotMatrixMode;
use crate::state::{SharedState, StateStore};

use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink, LimitInput};

const TASK_NAME: &str = "control";

/// Values the control task pushes to hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorFrame {
    pub angles: ServoArray<f32>,
    pub light_on: bool,
    pub diagnostic_led: bool,
}

/// Tunables copied out of [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlParams {
    pub step_deg: f32,
    pub valve_open_angle: f32,
    pub valve_closed_angle: f32,
    pub connection_timeout_ms: u64,
    pub diagnostic_hold_ms: u64,
}

impl ControlParams {
    pub fn from_config(config: &SystemConfig) -> Self {
        Self {
            step_deg: config.servo_step_deg,
            valve_open_angle: config.valve_open_angle,
            valve_closed_angle: config.valve_closed_angle,
            connection_timeout_ms: u64::from(config.connection_timeout_ms),
            diagnostic_hold_ms: u64::from(config.diagnostic_hold_ms),
        }
    }
}

/// Everything one control cycle decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutcome {
    pub frame: ActuatorFrame,
    pub limit_changed: bool,
    pub link: Option<LinkChange>,
    pub valve: Option<ValveTransition>,
    pub valve_open_ms: u64,
    pub display_mode: Option<DotMatrixMode>,
}

/// The body of one control cycle. Runs under the state lock.
pub fn control_cycle(
    shared: &mut SharedState,
    limit: LimitDirection,
    params: &ControlParams,
    now_ms: u64,
) -> ControlOutcome {
    let limit_changed = shared.device.set_limit(limit, now_ms);
    let link = shared
        .device
        .check_connection(now_ms, params.connection_timeout_ms);

    let cmd = shared.device.command;
    let valve = shared.valve.update(
        ValveInputs {
            commanded_open: cmd.valve_open,
            connected: cmd.connected,
            enabled: cmd.valve_enabled,
        },
        now_ms,
    );

    let mut targets = cmd.servo_targets;
    targets[ServoId::Valve] = if valve.open {
        params.valve_open_angle
    } else {
        params.valve_closed_angle
    };

    let out = &mut shared.device.output;
    for id in ServoId::ALL {
        let current = out.servo_angles[id];
        let mut target = targets[id];
        if id == ServoId::Pan && limit.blocks(current, target) {
            target = current;
        }
        let next = move_toward(current, target, params.step_deg);
        out.servo_angles[id] = next;
        out.servo_moving[id] = is_moving(next, target);
    }

    out.light_on = cmd.light_mode.light_on(cmd.connected);
    out.diagnostic_active = cmd
        .diagnostic_requested_at
        .is_some_and(|at| now_ms.saturating_sub(at) < params.diagnostic_hold_ms);

    let mode = cmd.dot_matrix.mode();
    let display_mode = (mode != out.dot_matrix_mode).then(|| {
        out.dot_matrix_mode = mode;
        mode
    });

    ControlOutcome {
        frame: ActuatorFrame {
            angles: out.servo_angles,
            light_on: out.light_on,
            diagnostic_led: out.diagnostic_active,
        },
        limit_changed,
        link,
        valve: valve.transition,
        valve_open_ms: shared.valve.state().accumulated_open_ms,
        display_mode,
    }
}

pub struct ControlTask<A: ActuatorPort, L: LimitInput, S: EventSink> {
    store: Arc<StateStore>,
    actuators: A,
    limits: L,
    events: S,
    params: ControlParams,
    period_ms: u64,
    /// Last frame written to hardware; `None` forces a full write.
    written: Option<ActuatorFrame>,
}

impl<A: ActuatorPort, L: LimitInput, S: EventSink> ControlTask<A, L, S> {
    pub fn new(
        store: Arc<StateStore>,
        actuators: A,
        limits: L,
        events: S,
        config: &SystemConfig,
    ) -> Self {
        Self {
            store,
            actuators,
            limits,
            events,
            params: ControlParams::from_config(config),
            period_ms: u64::from(config.control_period_ms),
            written: None,
        }
    }

    /// One control cycle at `now_ms`.
    pub fn step(&mut self, now_ms: u64) {
        let limit = self.limits.sample(now_ms);
        let params = self.params;

        let outcome = match self
            .store
            .with_exclusive(|shared| control_cycle(shared, limit, &params, now_ms))
        {
            Ok(outcome) => outcome,
            Err(cause) => {
                self.events.emit(&AppEvent::CycleSkipped {
                    task: TASK_NAME,
                    cause,
                });
                return;
            }
        };

        self.write_outputs(&outcome.frame);

        if outcome.limit_changed {
            log::debug!("LIMIT | {:?}", limit);
        }
        if let Some(change) = outcome.link {
            self.events.emit(&AppEvent::link(change));
        }
        if let Some(transition) = outcome.valve {
            self.events
                .emit(&AppEvent::valve(transition, outcome.valve_open_ms));
        }
        if let Some(mode) = outcome.display_mode {
            self.events.emit(&AppEvent::DisplayModeChanged(mode));
        }
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn events(&self) -> &S {
        &self.events
    }

    fn write_outputs(&mut self, frame: &ActuatorFrame) {
        let previous = self.written;
        for id in ServoId::ALL {
            let angle = frame.angles[id];
            if previous.is_none_or(|p| p.angles[id] != angle) {
                self.actuators.set_servo_angle(id, angle);
            }
        }
        if previous.is_none_or(|p| p.light_on != frame.light_on) {
            self.actuators.set_light(frame.light_on);
        }
        if previous.is_none_or(|p| p.diagnostic_led != frame.diagnostic_led) {
            self.actuators.set_diagnostic_led(frame.diagnostic_led);
        }
        self.written = Some(*frame);
    }
}

impl<A, L, S> PeriodicTask for ControlTask<A, L, S>
where
    A: ActuatorPort + Send,
    L: LimitInput + Send,
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
