//! Valve safety monitor.
//!
//! The monitor is the only authority on whether the dispensing valve may be
//! open. The control task feeds it the peer's intent, the link state and the
//! emergency-stop enable every cycle; the returned boolean is the valve's
//! actual position.
//!
//! ## Rule order (first match wins, re-evaluated from scratch every cycle)
//!
//! 1. Emergency stop (`!enabled`) forces the valve closed.
//! 2. Connection loss forces the valve closed.
//! 3. Open for `max_open_ms` or longer: close and latch the safety trip.
//! 4. Open requested while closed: open once the cooldown has elapsed
//!    and no trip is latched.
//! 5. Close requested while open: close.
//! 6. Otherwise hold, refreshing the accumulated open time.
//!
//! The trip stays latched until [`ValveSafetyMonitor::acknowledge_trip`] is
//! called; conditions looking normal again never clear it.

use crate::config::SystemConfig;
use log::error;

/// Why the monitor overrode the peer's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceReason {
    EmergencyStop,
    ConnectionLost,
    MaxOpenExceeded,
}

impl core::fmt::Display for ForceReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmergencyStop => write!(f, "emergency stop"),
            Self::ConnectionLost => write!(f, "connection lost"),
            Self::MaxOpenExceeded => write!(f, "max open time exceeded"),
        }
    }
}

/// Observable state of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValvePhase {
    Closed,
    Open,
    ForcedClosed(ForceReason),
}

/// A transition taken during one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveTransition {
    Opened,
    Closed,
    ForcedClosed(ForceReason),
}

/// Per-cycle inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValveInputs {
    pub commanded_open: bool,
    pub connected: bool,
    pub enabled: bool,
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValveOutcome {
    /// Authoritative "should be open".
    pub open: bool,
    pub transition: Option<ValveTransition>,
}

/// Valve bookkeeping, kept apart from the device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValveState {
    pub commanded_open: bool,
    pub actual_open: bool,
    /// False only while the emergency stop is engaged.
    pub enabled: bool,
    pub open_started_at: u64,
    pub accumulated_open_ms: u64,
    /// `None` until the valve has closed at least once.
    pub last_closed_at: Option<u64>,
    /// Sticky max-open trip.
    pub safety_triggered: bool,
}

impl Default for ValveState {
    fn default() -> Self {
        Self {
            commanded_open: false,
            actual_open: false,
            enabled: true,
            open_started_at: 0,
            accumulated_open_ms: 0,
            last_closed_at: None,
            safety_triggered: false,
        }
    }
}

/// Valve safety state machine. Pure state plus the caller's clock.
#[derive(Debug, Clone)]
pub struct ValveSafetyMonitor {
    state: ValveState,
    connected: bool,
    max_open_ms: u64,
    cooldown_ms: u64,
}

impl ValveSafetyMonitor {
    pub fn new(config: &SystemConfig) -> Self {
        Self::with_limits(
            u64::from(config.valve_max_open_ms),
            u64::from(config.valve_cooldown_ms),
        )
    }

    pub fn with_limits(max_open_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            state: ValveState::default(),
            connected: false,
            max_open_ms,
            cooldown_ms,
        }
    }

    /// Run the rule table once.
    pub fn update(&mut self, inputs: ValveInputs, now_ms: u64) -> ValveOutcome {
        self.state.commanded_open = inputs.commanded_open;
        self.state.enabled = inputs.enabled;
        self.connected = inputs.connected;

        let transition = if !inputs.enabled {
            self.force_close(ForceReason::EmergencyStop, now_ms)
        } else if !inputs.connected {
            self.force_close(ForceReason::ConnectionLost, now_ms)
        } else if self.state.actual_open
            && now_ms.saturating_sub(self.state.open_started_at) >= self.max_open_ms
        {
            self.state.safety_triggered = true;
            self.force_close(ForceReason::MaxOpenExceeded, now_ms)
        } else if inputs.commanded_open && !self.state.actual_open {
            if self.state.safety_triggered || !self.cooldown_elapsed(now_ms) {
                None
            } else {
                self.state.actual_open = true;
                self.state.open_started_at = now_ms;
                self.state.accumulated_open_ms = 0;
                Some(ValveTransition::Opened)
            }
        } else if !inputs.commanded_open && self.state.actual_open {
            self.close(now_ms);
            Some(ValveTransition::Closed)
        } else {
            if self.state.actual_open {
                self.state.accumulated_open_ms = now_ms.saturating_sub(self.state.open_started_at);
            }
            None
        };

        ValveOutcome {
            open: self.state.actual_open,
            transition,
        }
    }

    /// Engage the emergency stop immediately, outside the regular cycle.
    ///
    /// Idempotent: a second call while stopped changes nothing.
    pub fn emergency_stop(&mut self, now_ms: u64) -> Option<ValveTransition> {
        self.state.enabled = false;
        self.force_close(ForceReason::EmergencyStop, now_ms)
    }

    /// Operator acknowledgement of a latched max-open trip.
    ///
    /// Returns `true` if a trip was actually cleared.
    pub fn acknowledge_trip(&mut self) -> bool {
        if self.state.safety_triggered {
            self.state.safety_triggered = false;
            true
        } else {
            false
        }
    }

    pub fn state(&self) -> &ValveState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.actual_open
    }

    /// Derived phase, reflecting the inputs of the last evaluation.
    pub fn phase(&self) -> ValvePhase {
        if self.state.actual_open {
            ValvePhase::Open
        } else if !self.state.enabled {
            ValvePhase::ForcedClosed(ForceReason::EmergencyStop)
        } else if !self.connected {
            ValvePhase::ForcedClosed(ForceReason::ConnectionLost)
        } else if self.state.safety_triggered {
            ValvePhase::ForcedClosed(ForceReason::MaxOpenExceeded)
        } else {
            ValvePhase::Closed
        }
    }

    // ── Internal ──────────────────────────────────────────────────

    fn cooldown_elapsed(&self, now_ms: u64) -> bool {
        self.state
            .last_closed_at
            .is_none_or(|closed_at| now_ms.saturating_sub(closed_at) >= self.cooldown_ms)
    }

    fn force_close(&mut self, reason: ForceReason, now_ms: u64) -> Option<ValveTransition> {
        if !self.state.actual_open {
            return None;
        }
        self.close(now_ms);
        if reason == ForceReason::MaxOpenExceeded {
            error!("SAFETY TRIP: valve open {} ms, forced closed", self.state.accumulated_open_ms);
        }
        Some(ValveTransition::ForcedClosed(reason))
    }

    fn close(&mut self, now_ms: u64) {
        self.state.accumulated_open_ms = now_ms.saturating_sub(self.state.open_started_at);
        self.state.actual_open = false;
        self.state.last_closed_at = Some(now_ms);
    }
}
