//! Debounced pan travel limit switches.
//!
//! ## Hardware
//!
//! Two active-low micro switches with pull-ups, one at each end of the
//! pan travel. A switch is reported only after its level has been stable
//! for the debounce window; the control task samples it every cycle.
//!
//! If both ends read triggered at once (wiring fault), the positive end
//! wins so that the servo can still be driven back down.

use embedded_hal::digital::InputPin;
use log::{info, warn};

use crate::app::ports::LimitInput;
use crate::error::SensorError;
use crate::state::device::LimitDirection;

/// Debounce filter for one digital input.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    debounce_ms: u64,
    last_raw: bool,
    stable: bool,
    last_change_ms: u64,
}

impl Debouncer {
    pub fn new(debounce_ms: u64, initial: bool, now_ms: u64) -> Self {
        Self {
            debounce_ms,
            last_raw: initial,
            stable: initial,
            last_change_ms: now_ms,
        }
    }

    /// Feed a raw sample; returns the debounced level.
    pub fn update(&mut self, raw: bool, now_ms: u64) -> bool {
        if raw != self.last_raw {
            self.last_raw = raw;
            self.last_change_ms = now_ms;
        }
        if now_ms.saturating_sub(self.last_change_ms) >= self.debounce_ms {
            self.stable = self.last_raw;
        }
        self.stable
    }

    pub fn stable(&self) -> bool {
        self.stable
    }
}

/// Pair of limit switches behind embedded-hal input pins.
pub struct LimitSwitches<P: InputPin, N: InputPin> {
    positive_pin: P,
    negative_pin: N,
    positive: Debouncer,
    negative: Debouncer,
    read_errors: u32,
}

impl<P: InputPin, N: InputPin> LimitSwitches<P, N> {
    pub fn new(positive_pin: P, negative_pin: N, debounce_ms: u64, now_ms: u64) -> Self {
        let mut switches = Self {
            positive_pin,
            negative_pin,
            positive: Debouncer::new(debounce_ms, false, now_ms),
            negative: Debouncer::new(debounce_ms, false, now_ms),
            read_errors: 0,
        };
        // Seed from the real levels so a switch held at boot is reported
        // without waiting out the debounce window.
        let pos = switches.read_positive();
        let neg = switches.read_negative();
        switches.positive = Debouncer::new(debounce_ms, pos, now_ms);
        switches.negative = Debouncer::new(debounce_ms, neg, now_ms);
        info!("Limit switches initialised (pos={}, neg={})", pos, neg);
        switches
    }

    /// Total failed pin reads since boot.
    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }

    // Active LOW. A failed read keeps the last raw level.
    fn read_positive(&mut self) -> bool {
        let level = read_active_low(&mut self.positive_pin);
        self.level_or_last(level, self.positive.last_raw)
    }

    fn read_negative(&mut self) -> bool {
        let level = read_active_low(&mut self.negative_pin);
        self.level_or_last(level, self.negative.last_raw)
    }

    fn level_or_last(&mut self, level: Result<bool, SensorError>, last: bool) -> bool {
        level.unwrap_or_else(|e| {
            self.note_read_error(e);
            last
        })
    }

    fn note_read_error(&mut self, e: SensorError) {
        if self.read_errors == 0 {
            warn!("Limit switch {}, holding last level", e);
        }
        self.read_errors = self.read_errors.saturating_add(1);
    }
}

fn read_active_low<P: InputPin>(pin: &mut P) -> Result<bool, SensorError> {
    pin.is_low().map_err(|_| SensorError::GpioReadFailed)
}

impl<P: InputPin, N: InputPin> LimitInput for LimitSwitches<P, N> {
    fn sample(&mut self, now_ms: u64) -> LimitDirection {
        let pos_raw = self.read_positive();
        let neg_raw = self.read_negative();
        let pos = self.positive.update(pos_raw, now_ms);
        let neg = self.negative.update(neg_raw, now_ms);
        match (pos, neg) {
            (true, _) => LimitDirection::Positive,
            (false, true) => LimitDirection::Negative,
            (false, false) => LimitDirection::None,
        }
    }
}
