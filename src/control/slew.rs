//! Servo slew limiter
//!
//! Moves each actuator toward its target by at most a fixed step per
//! control cycle. Actuators are stepped independently; the only thing
//! they share is the step size.

use crate::config::{ARRIVE_EPSILON_DEG, SERVO_CENTER_ANGLE, SERVO_MAX_ANGLE, SERVO_MIN_ANGLE};

/// Clamp an angle into the legal servo range.
///
/// Infinities land on the nearest bound; NaN falls back to center.
pub fn clamp_angle(angle: f32) -> f32 {
    if angle.is_nan() {
        return SERVO_CENTER_ANGLE;
    }
    angle.clamp(SERVO_MIN_ANGLE, SERVO_MAX_ANGLE)
}

/// One slew step from `current` toward `target`.
///
/// Within [`ARRIVE_EPSILON_DEG`] the servo counts as arrived and
/// `current` is returned untouched.
pub fn move_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let diff = target - current;
    if diff.abs() < ARRIVE_EPSILON_DEG {
        return current;
    }
    let step = diff.abs().min(max_step);
    clamp_angle(current + step.copysign(diff))
}

/// Still travelling after this cycle's step.
pub fn is_moving(current: f32, target: f32) -> bool {
    (current - target).abs() > ARRIVE_EPSILON_DEG
}
