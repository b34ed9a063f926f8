//! Port traits, the hexagonal boundary between the tasks and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Comm / Control / Animation task
//! ```
//!
//! Drivers and adapters implement these traits; the tasks consume them
//! via generics, so the concurrency and safety core never touches
//! hardware directly and runs unchanged against the mocks in `tests/`.
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::config::SystemConfig;
use crate::effects::{DotMatrixFrame, PixelMatrixFrame, RingFrame};
use crate::state::device::{LimitDirection, ServoId};
use crate::state::peripherals::Rgb;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock. Every timeout in the firmware compares
/// against this, never against wall time.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Limit input port (driven adapter: hardware → control task)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the debounced travel limit.
pub trait LimitInput {
    /// Sample the switches and return the debounced direction.
    fn sample(&mut self, now_ms: u64) -> LimitDirection;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: control task → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the motion and light outputs.
pub trait ActuatorPort {
    /// Drive a servo to an absolute angle (degrees, already clamped).
    fn set_servo_angle(&mut self, servo: ServoId, degrees: f32);

    /// Switch the main light.
    fn set_light(&mut self, on: bool);

    /// Switch the diagnostic LED.
    fn set_diagnostic_led(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: animation task → LEDs/displays)
// ───────────────────────────────────────────────────────────────

/// Narrow "set output" functions for the visual peripherals. LED
/// protocols, fonts and glyph bitmaps live behind this trait.
pub trait IndicatorPort {
    fn set_strip(&mut self, colour: Rgb);

    fn show_ring(&mut self, frame: &RingFrame);

    fn show_pixel_matrix(&mut self, frame: &PixelMatrixFrame);

    fn show_dot_matrix(&mut self, frame: &DotMatrixFrame);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: tasks → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The tasks emit structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: boot ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// # Security
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped, so a bad blob can never stretch the valve
/// max-open time or shrink the connection failsafe into uselessness.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
