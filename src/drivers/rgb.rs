//! RGB LED strip driver.
//!
//! Three PWM channels drive the R/G/B legs of an analog LED strip.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: three LEDC channels (`LedcDriver` implements
//! `SetDutyCycle`).
//! On host/test: any `SetDutyCycle` fake.

use embedded_hal::pwm::SetDutyCycle;

use crate::error::ActuatorError;
use crate::state::peripherals::Rgb;

pub struct RgbLed<P: SetDutyCycle> {
    red: P,
    green: P,
    blue: P,
    current: Rgb,
}

impl<P: SetDutyCycle> RgbLed<P> {
    pub fn new(red: P, green: P, blue: P) -> Self {
        Self {
            red,
            green,
            blue,
            current: (0, 0, 0),
        }
    }

    pub fn set_colour(&mut self, (r, g, b): Rgb) -> Result<(), ActuatorError> {
        for (channel, level) in [(&mut self.red, r), (&mut self.green, g), (&mut self.blue, b)] {
            channel
                .set_duty_cycle_fraction(u16::from(level), 255)
                .map_err(|_| ActuatorError::PwmWriteFailed)?;
        }
        self.current = (r, g, b);
        Ok(())
    }

    pub fn off(&mut self) -> Result<(), ActuatorError> {
        self.set_colour((0, 0, 0))
    }

    pub fn current_colour(&self) -> Rgb {
        self.current
    }
}
