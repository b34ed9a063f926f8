//! Unified error types for the animatron firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! task loops' error handling uniform. All variants are `Copy` so they
//! travel through events and logs without allocation.

use core::fmt;

use crate::app::ports::ConfigError;
use crate::protocol::packet::PacketKind;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An inbound line could not be decoded.
    Protocol(ProtocolError),
    /// The shared state lock was not acquired in time.
    Lock(LockTimeout),
    /// A sensor input could not be read.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Lock(e) => write!(f, "lock: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Reasons a framed line is rejected as a whole.
///
/// Out-of-range numeric values are never errors; they are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Line carried nothing after the start marker.
    Empty,
    /// Line did not begin with the start marker.
    MissingStartMarker,
    /// Line is not valid ASCII/UTF-8.
    NotUtf8,
    /// Tag is not one of the known packet kinds.
    UnknownTag,
    /// Field count outside the kind's accepted arity.
    FieldCount { kind: PacketKind, got: usize },
    /// A field could not be parsed as its expected type.
    BadField { kind: PacketKind, index: usize },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::MissingStartMarker => write!(f, "missing start marker"),
            Self::NotUtf8 => write!(f, "non-ASCII bytes"),
            Self::UnknownTag => write!(f, "unknown packet tag"),
            Self::FieldCount { kind, got } => {
                let (min, max) = kind.arity();
                write!(f, "{} expects {}..={} fields, got {}", kind.tag(), min, max, got)
            }
            Self::BadField { kind, index } => {
                write!(f, "{} field {} is malformed", kind.tag(), index)
            }
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Lock timeout
// ---------------------------------------------------------------------------

/// The state store could not be locked within its bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTimeout {
    pub waited_ms: u32,
}

impl fmt::Display for LockTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "state lock not acquired within {} ms", self.waited_ms)
    }
}

impl From<LockTimeout> for Error {
    fn from(e: LockTimeout) -> Self {
        Self::Lock(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// GPIO read returned an error.
    GpioReadFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
