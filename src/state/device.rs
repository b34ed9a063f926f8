//! Device state record.
//!
//! Three sections, each with a single writer:
//!
//! | Section   | Writer                                  |
//! |-----------|-----------------------------------------|
//! | `input`   | control task (debounced sensors)        |
//! | `command` | communication task (decoded packets)    |
//! | `output`  | control task (slew + light derivation)  |
//!
//! Nothing here locks; [`StateStore`](super::store::StateStore) owns the
//! exclusion.

use core::ops::{Index, IndexMut};

use crate::config::{NUM_HEAD_SERVOS, NUM_SERVOS, SERVO_CENTER_ANGLE, SystemConfig};

use super::peripherals::{
    DotMatrixCommand, DotMatrixMode, PixelMatrixCommand, RingCommand, StripCommand,
};

// ---------------------------------------------------------------------------
// Actuator identity
// ---------------------------------------------------------------------------

/// Strongly-typed servo index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServoId {
    Pan = 0,
    Tilt = 1,
    Aux = 2,
    /// Servo-actuated dispensing valve. Never targeted by the peer.
    Valve = 3,
}

impl ServoId {
    pub const ALL: [Self; NUM_SERVOS] = [Self::Pan, Self::Tilt, Self::Aux, Self::Valve];
    /// The servos a `SRV` packet addresses, in wire order.
    pub const HEAD: [Self; NUM_HEAD_SERVOS] = [Self::Pan, Self::Tilt, Self::Aux];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Fixed-size per-servo storage indexed by [`ServoId`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoArray<T>(pub [T; NUM_SERVOS]);

impl<T: Copy> ServoArray<T> {
    pub const fn splat(value: T) -> Self {
        Self([value; NUM_SERVOS])
    }
}

impl<T> ServoArray<T> {
    pub fn iter(&self) -> impl Iterator<Item = (ServoId, &T)> {
        ServoId::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<ServoId> for ServoArray<T> {
    type Output = T;

    fn index(&self, id: ServoId) -> &T {
        &self.0[id.index()]
    }
}

impl<T> IndexMut<ServoId> for ServoArray<T> {
    fn index_mut(&mut self, id: ServoId) -> &mut T {
        &mut self.0[id.index()]
    }
}

// ---------------------------------------------------------------------------
// Enumerated inputs and modes
// ---------------------------------------------------------------------------

/// Debounced limit switch direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LimitDirection {
    #[default]
    None = 0,
    /// Travel toward higher angles is blocked.
    Positive = 1,
    /// Travel toward lower angles is blocked.
    Negative = 2,
}

impl LimitDirection {
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether this limit forbids moving from `current` to `target`.
    pub fn blocks(self, current: f32, target: f32) -> bool {
        match self {
            Self::None => false,
            Self::Positive => target > current,
            Self::Negative => target < current,
        }
    }
}

/// Light / illumination mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LightMode {
    Off = 0,
    On = 1,
    /// On while a peer is connected.
    #[default]
    Auto = 2,
}

impl LightMode {
    /// Decode a wire code, clamping into 0..=2.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::On,
            _ => Self::Auto,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn light_on(self, connected: bool) -> bool {
        match self {
            Self::Off => false,
            Self::On => true,
            Self::Auto => connected,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputSection {
    pub limit: LimitDirection,
    /// Time the debounced limit last changed (ms).
    pub limit_changed_at: u64,
}

/// Peer bit 0 in the `FLG` bitmask: request a diagnostic pulse.
pub const FLAG_DIAGNOSTIC: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandSection {
    /// Peer targets. The valve slot is unused; its target comes from the
    /// valve safety monitor.
    pub servo_targets: ServoArray<f32>,
    pub light_mode: LightMode,
    pub flags: u8,
    pub strip: StripCommand,
    pub ring: RingCommand,
    pub pixel_matrix: PixelMatrixCommand,
    pub dot_matrix: DotMatrixCommand,
    pub valve_open: bool,
    /// False while the emergency stop is engaged.
    pub valve_enabled: bool,
    /// When bit 0 of the flags was last raised (ms).
    pub diagnostic_requested_at: Option<u64>,
    pub last_command_at: u64,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputSection {
    pub servo_angles: ServoArray<f32>,
    pub servo_moving: ServoArray<bool>,
    pub light_on: bool,
    pub diagnostic_active: bool,
    pub dot_matrix_mode: DotMatrixMode,
}

impl OutputSection {
    pub fn any_moving(&self) -> bool {
        self.servo_moving.0.iter().any(|m| *m)
    }
}

/// What a connection check observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
    Established,
    Lost { silent_ms: u64 },
}

/// The single shared device record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceState {
    pub input: InputSection,
    pub command: CommandSection,
    pub output: OutputSection,
}

impl DeviceState {
    /// Boot state: head servos centered, valve closed, outputs matching
    /// their targets, peer not connected.
    pub fn new(config: &SystemConfig) -> Self {
        let mut targets = ServoArray::splat(SERVO_CENTER_ANGLE);
        targets[ServoId::Valve] = config.valve_closed_angle;
        let dot_matrix = DotMatrixCommand::default();

        Self {
            input: InputSection::default(),
            command: CommandSection {
                servo_targets: targets,
                light_mode: LightMode::default(),
                flags: 0,
                strip: StripCommand::default(),
                ring: RingCommand::default(),
                pixel_matrix: PixelMatrixCommand::default(),
                dot_matrix,
                valve_open: false,
                valve_enabled: true,
                diagnostic_requested_at: None,
                last_command_at: 0,
                connected: false,
            },
            output: OutputSection {
                servo_angles: targets,
                servo_moving: ServoArray::splat(false),
                light_on: false,
                diagnostic_active: false,
                dot_matrix_mode: dot_matrix.mode(),
            },
        }
    }

    /// Record a successfully decoded packet.
    pub fn on_command_received(&mut self, now_ms: u64) -> Option<LinkChange> {
        self.command.last_command_at = now_ms;
        if self.command.connected {
            None
        } else {
            self.command.connected = true;
            Some(LinkChange::Established)
        }
    }

    /// Flip `connected` off once the peer has been silent past `timeout_ms`.
    ///
    /// Reports the loss exactly once. A stale valve-open intent is dropped
    /// with the link so that a reconnecting peer has to ask again.
    pub fn check_connection(&mut self, now_ms: u64, timeout_ms: u64) -> Option<LinkChange> {
        if !self.command.connected {
            return None;
        }
        let silent_ms = now_ms.saturating_sub(self.command.last_command_at);
        if silent_ms <= timeout_ms {
            return None;
        }
        self.command.connected = false;
        self.command.valve_open = false;
        Some(LinkChange::Lost { silent_ms })
    }

    /// Update the debounced limit input.
    pub fn set_limit(&mut self, limit: LimitDirection, now_ms: u64) -> bool {
        if self.input.limit == limit {
            return false;
        }
        self.input.limit = limit;
        self.input.limit_changed_at = now_ms;
        true
    }
}
