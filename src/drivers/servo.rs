//! Hobby servo driver.
//!
//! Standard 50 Hz servo PWM: a 500 us pulse is 0 degrees, 2500 us is
//! 180 degrees, linear in between.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: an LEDC channel (`LedcDriver` implements
//! `SetDutyCycle`) configured for 50 Hz.
//! On host/test: any `SetDutyCycle` fake.

use embedded_hal::pwm::SetDutyCycle;

use crate::config::{SERVO_MAX_ANGLE, SERVO_MIN_ANGLE};
use crate::control::slew::clamp_angle;
use crate::error::ActuatorError;

/// Servo PWM frequency.
pub const SERVO_FREQ_HZ: u32 = 50;
/// PWM period at [`SERVO_FREQ_HZ`].
pub const SERVO_PERIOD_US: u32 = 1_000_000 / SERVO_FREQ_HZ;
/// Pulse width at [`SERVO_MIN_ANGLE`].
pub const MIN_PULSE_US: u32 = 500;
/// Pulse width at [`SERVO_MAX_ANGLE`].
pub const MAX_PULSE_US: u32 = 2500;

/// Pulse width for `degrees`, clamped into the legal range.
pub fn pulse_width_us(degrees: f32) -> u32 {
    let span = (MAX_PULSE_US - MIN_PULSE_US) as f32;
    let fraction = (clamp_angle(degrees) - SERVO_MIN_ANGLE) / (SERVO_MAX_ANGLE - SERVO_MIN_ANGLE);
    MIN_PULSE_US + (fraction * span).round() as u32
}

pub struct ServoDriver<P: SetDutyCycle> {
    pwm: P,
    angle: Option<f32>,
}

impl<P: SetDutyCycle> ServoDriver<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm, angle: None }
    }

    /// Command an absolute angle.
    pub fn set_angle(&mut self, degrees: f32) -> Result<(), ActuatorError> {
        let degrees = clamp_angle(degrees);
        self.pwm
            .set_duty_cycle_fraction(pulse_width_us(degrees) as u16, SERVO_PERIOD_US as u16)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.angle = Some(degrees);
        Ok(())
    }

    /// Last angle written successfully.
    pub fn angle(&self) -> Option<f32> {
        self.angle
    }
}
