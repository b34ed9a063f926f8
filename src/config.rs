//! System configuration parameters
//!
//! Compile-time protocol and geometry constants, plus the load-time
//! [`SystemConfig`] that can be overridden from NVS.

use serde::{Deserialize, Serialize};

// --- Servo geometry (compile-time) ---

/// Lowest legal servo angle in degrees.
pub const SERVO_MIN_ANGLE: f32 = 0.0;
/// Highest legal servo angle in degrees.
pub const SERVO_MAX_ANGLE: f32 = 180.0;
/// Boot position for every head servo.
pub const SERVO_CENTER_ANGLE: f32 = 90.0;
/// Distance below which a servo counts as arrived at its target.
pub const ARRIVE_EPSILON_DEG: f32 = 0.1;

/// Servos the peer addresses directly (pan, tilt, aux).
pub const NUM_HEAD_SERVOS: usize = 3;
/// Head servos plus the valve actuator.
pub const NUM_SERVOS: usize = NUM_HEAD_SERVOS + 1;

/// Pixels on the addressable ring.
pub const RING_PIXELS: usize = 8;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Motion ---
    /// Maximum servo travel per control cycle (degrees)
    pub servo_step_deg: f32,
    /// Valve servo angle when the valve is closed (degrees)
    pub valve_closed_angle: f32,
    /// Valve servo angle when the valve is open (degrees)
    pub valve_open_angle: f32,

    // --- Valve safety ---
    /// Longest a single dispense may stay open before the safety trip (ms)
    pub valve_max_open_ms: u32,
    /// Minimum closed time between two openings (ms)
    pub valve_cooldown_ms: u32,

    // --- Link ---
    /// Silence after which the peer is considered gone (ms)
    pub connection_timeout_ms: u32,
    /// Status line interval while connected (ms)
    pub status_interval_ms: u32,

    // --- Tasks ---
    /// Control task period (ms)
    pub control_period_ms: u32,
    /// Communication task period (ms)
    pub comm_period_ms: u32,
    /// Animation task period (ms)
    pub animation_period_ms: u32,
    /// Bounded wait for the shared state lock (ms)
    pub lock_timeout_ms: u32,

    // --- Inputs ---
    /// Limit switch debounce window (ms)
    pub limit_debounce_ms: u32,
    /// How long a diagnostic request keeps the diagnostic flag raised (ms)
    pub diagnostic_hold_ms: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Motion
            servo_step_deg: 2.0,
            valve_closed_angle: 0.0,
            valve_open_angle: 90.0,

            // Valve safety
            valve_max_open_ms: 5000,
            valve_cooldown_ms: 500,

            // Link
            connection_timeout_ms: 500,
            status_interval_ms: 50, // 20 Hz

            // Tasks
            control_period_ms: 10,   // 100 Hz
            comm_period_ms: 33,      // ~30 Hz
            animation_period_ms: 20, // 50 Hz
            lock_timeout_ms: 5,

            // Inputs
            limit_debounce_ms: 50,
            diagnostic_hold_ms: 1000,
        }
    }
}
