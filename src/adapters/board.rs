//! Board adapter, bridging the drivers to the domain port traits.
//!
//! [`BoardActuators`] owns the four servo channels plus the light and
//! diagnostic outputs and exposes them through [`ActuatorPort`].
//! [`BoardIndicators`] drives the RGB strip through [`IndicatorPort`] and
//! hands the ring and matrix frames to whatever renders them.
//!
//! Ports return nothing, so write failures end here: each is counted and
//! the first one is logged.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{trace, warn};

use crate::app::ports::{ActuatorPort, IndicatorPort};
use crate::config::NUM_SERVOS;
use crate::drivers::rgb::RgbLed;
use crate::drivers::servo::ServoDriver;
use crate::effects::{DotMatrixFrame, PixelMatrixFrame, RingFrame};
use crate::error::ActuatorError;
use crate::state::device::ServoId;
use crate::state::peripherals::Rgb;

/// Failed-write bookkeeping shared by both adapters.
#[derive(Debug, Default, Clone, Copy)]
struct WriteFaults {
    count: u32,
}

impl WriteFaults {
    fn record(&mut self, what: &str, result: Result<(), ActuatorError>) {
        if let Err(e) = result {
            if self.count == 0 {
                warn!("Actuator write failed ({}): {}", what, e);
            }
            self.count = self.count.saturating_add(1);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Actuators
// ───────────────────────────────────────────────────────────────

pub struct BoardActuators<S: SetDutyCycle, L: OutputPin, D: OutputPin> {
    servos: [ServoDriver<S>; NUM_SERVOS],
    light: L,
    diagnostic_led: D,
    faults: WriteFaults,
}

impl<S: SetDutyCycle, L: OutputPin, D: OutputPin> BoardActuators<S, L, D> {
    /// `servos` in [`ServoId`] order.
    pub fn new(servos: [S; NUM_SERVOS], light: L, diagnostic_led: D) -> Self {
        Self {
            servos: servos.map(ServoDriver::new),
            light,
            diagnostic_led,
            faults: WriteFaults::default(),
        }
    }

    /// Total failed writes since boot.
    pub fn write_faults(&self) -> u32 {
        self.faults.count
    }

    pub fn servo_angle(&self, id: ServoId) -> Option<f32> {
        self.servos[id.index()].angle()
    }
}

fn set_output<P: OutputPin>(pin: &mut P, on: bool) -> Result<(), ActuatorError> {
    let result = if on { pin.set_high() } else { pin.set_low() };
    result.map_err(|_| ActuatorError::GpioWriteFailed)
}

impl<S: SetDutyCycle, L: OutputPin, D: OutputPin> ActuatorPort for BoardActuators<S, L, D> {
    fn set_servo_angle(&mut self, servo: ServoId, degrees: f32) {
        let result = self.servos[servo.index()].set_angle(degrees);
        self.faults.record("servo", result);
    }

    fn set_light(&mut self, on: bool) {
        let result = set_output(&mut self.light, on);
        self.faults.record("light", result);
    }

    fn set_diagnostic_led(&mut self, on: bool) {
        let result = set_output(&mut self.diagnostic_led, on);
        self.faults.record("diagnostic LED", result);
    }
}

// ───────────────────────────────────────────────────────────────
// Indicators
// ───────────────────────────────────────────────────────────────

/// Latest frames for the addressable peripherals. Their LED protocols,
/// fonts and glyph bitmaps live outside the firmware core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingFrames {
    pub ring: Option<RingFrame>,
    pub pixel_matrix: Option<PixelMatrixFrame>,
    pub dot_matrix: Option<DotMatrixFrame>,
}

pub struct BoardIndicators<P: SetDutyCycle> {
    strip: RgbLed<P>,
    frames: PendingFrames,
    faults: WriteFaults,
}

impl<P: SetDutyCycle> BoardIndicators<P> {
    pub fn new(strip: RgbLed<P>) -> Self {
        Self {
            strip,
            frames: PendingFrames::default(),
            faults: WriteFaults::default(),
        }
    }

    /// Take the frames produced since the last call.
    pub fn take_frames(&mut self) -> PendingFrames {
        core::mem::take(&mut self.frames)
    }

    pub fn write_faults(&self) -> u32 {
        self.faults.count
    }
}

impl<P: SetDutyCycle> IndicatorPort for BoardIndicators<P> {
    fn set_strip(&mut self, colour: Rgb) {
        let result = self.strip.set_colour(colour);
        self.faults.record("strip", result);
    }

    fn show_ring(&mut self, frame: &RingFrame) {
        trace!("ring {:?}", frame);
        self.frames.ring = Some(*frame);
    }

    fn show_pixel_matrix(&mut self, frame: &PixelMatrixFrame) {
        trace!("pixel matrix {:?}", frame);
        self.frames.pixel_matrix = Some(*frame);
    }

    fn show_dot_matrix(&mut self, frame: &DotMatrixFrame) {
        trace!("dot matrix {:?}", frame);
        self.frames.dot_matrix = Some(*frame);
    }
}
