//! Inbound packet decoding.
//!
//! One table-driven decoder for every packet kind. Each kind declares its
//! tag and its accepted field count range; optional trailing fields take
//! documented defaults.
//!
//! | Tag   | Fields | Content                                            |
//! |-------|--------|----------------------------------------------------|
//! | `CMD` | 3      | pan angle, light mode, flags                       |
//! | `SRV` | 3      | pan, tilt, aux angles                              |
//! | `LGT` | 1      | light mode (0 off, 1 on, 2 auto)                   |
//! | `RGB` | 4..8   | mode, r, g, b, [r2, g2, b2, speed]                 |
//! | `MTX` | 2      | left, right dot-matrix pattern                     |
//! | `NPM` | 5..9   | mode, glyph, r, g, b, [r2, g2, b2, speed]          |
//! | `NPR` | 4..8   | mode, r, g, b, [r2, g2, b2, speed]                 |
//! | `FLG` | 1      | flag bitmask                                       |
//! | `VLV` | 1      | valve intent (0 closed, 1 open)                    |
//! | `EST` | 1      | valve enable (0 emergency stop, 1 release)         |
//! | `ACK` | 0      | acknowledge a latched valve safety trip            |
//!
//! Values outside their range are clamped. Only syntax errors (unknown
//! tag, bad arity, unparsable field) reject the packet.

use core::num::IntErrorKind;

use heapless::Vec;

use crate::config::NUM_HEAD_SERVOS;
use crate::control::slew::clamp_angle;
use crate::error::ProtocolError;
use crate::state::device::LightMode;
use crate::state::peripherals::{
    ColorParams, DotMatrixCommand, DotPattern, PixelMatrixCommand, PixelMatrixMode, Rgb,
    RingCommand, RingMode, StripCommand, StripMode,
};

use super::codec::START_MARKER;

/// Widest packet (`NPM`) carries nine fields.
const MAX_FIELDS: usize = 9;

// ═══════════════════════════════════════════════════════════════
//  Packet kinds
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Legacy,
    Servo,
    Light,
    Strip,
    DotMatrix,
    PixelMatrix,
    Ring,
    Flags,
    Valve,
    EmergencyStop,
    Acknowledge,
}

struct KindRow {
    kind: PacketKind,
    tag: &'static str,
    min_fields: usize,
    max_fields: usize,
}

const KINDS: [KindRow; 11] = [
    KindRow { kind: PacketKind::Legacy, tag: "CMD", min_fields: 3, max_fields: 3 },
    KindRow { kind: PacketKind::Servo, tag: "SRV", min_fields: 3, max_fields: 3 },
    KindRow { kind: PacketKind::Light, tag: "LGT", min_fields: 1, max_fields: 1 },
    KindRow { kind: PacketKind::Strip, tag: "RGB", min_fields: 4, max_fields: 8 },
    KindRow { kind: PacketKind::DotMatrix, tag: "MTX", min_fields: 2, max_fields: 2 },
    KindRow { kind: PacketKind::PixelMatrix, tag: "NPM", min_fields: 5, max_fields: 9 },
    KindRow { kind: PacketKind::Ring, tag: "NPR", min_fields: 4, max_fields: 8 },
    KindRow { kind: PacketKind::Flags, tag: "FLG", min_fields: 1, max_fields: 1 },
    KindRow { kind: PacketKind::Valve, tag: "VLV", min_fields: 1, max_fields: 1 },
    KindRow { kind: PacketKind::EmergencyStop, tag: "EST", min_fields: 1, max_fields: 1 },
    KindRow { kind: PacketKind::Acknowledge, tag: "ACK", min_fields: 0, max_fields: 0 },
];

impl PacketKind {
    fn row(self) -> &'static KindRow {
        // KINDS is declared in enum order.
        &KINDS[self as usize]
    }

    pub fn tag(self) -> &'static str {
        self.row().tag
    }

    /// Accepted field count range, inclusive.
    pub fn arity(self) -> (usize, usize) {
        let row = self.row();
        (row.min_fields, row.max_fields)
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        KINDS.iter().find(|s| s.tag == tag).map(|s| s.kind)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Decoded commands
// ═══════════════════════════════════════════════════════════════

/// A validated, clamped inbound command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Single-servo command from the first protocol revision.
    Legacy {
        pan_target: f32,
        light: LightMode,
        flags: u8,
    },
    ServoTargets([f32; NUM_HEAD_SERVOS]),
    Light(LightMode),
    Strip(StripCommand),
    DotMatrix(DotMatrixCommand),
    PixelMatrix(PixelMatrixCommand),
    Ring(RingCommand),
    Flags(u8),
    Valve { open: bool },
    ValveEnable(bool),
    AcknowledgeTrip,
}

impl Command {
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Legacy { .. } => PacketKind::Legacy,
            Self::ServoTargets(_) => PacketKind::Servo,
            Self::Light(_) => PacketKind::Light,
            Self::Strip(_) => PacketKind::Strip,
            Self::DotMatrix(_) => PacketKind::DotMatrix,
            Self::PixelMatrix(_) => PacketKind::PixelMatrix,
            Self::Ring(_) => PacketKind::Ring,
            Self::Flags(_) => PacketKind::Flags,
            Self::Valve { .. } => PacketKind::Valve,
            Self::ValveEnable(_) => PacketKind::EmergencyStop,
            Self::AcknowledgeTrip => PacketKind::Acknowledge,
        }
    }
}

/// Decode one framed line (start marker included, terminator stripped).
pub fn decode(line: &[u8]) -> Result<Command, ProtocolError> {
    let body = line
        .strip_prefix(&[START_MARKER])
        .ok_or(ProtocolError::MissingStartMarker)?;
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    if body.is_empty() {
        return Err(ProtocolError::Empty);
    }
    let text = core::str::from_utf8(body).map_err(|_| ProtocolError::NotUtf8)?;

    let mut parts = text.split(',');
    let tag = parts.next().unwrap_or_default();
    if !(3..=4).contains(&tag.len()) || !tag.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(ProtocolError::UnknownTag);
    }
    let kind = PacketKind::from_tag(tag).ok_or(ProtocolError::UnknownTag)?;

    let count = parts.clone().count();
    let (min, max) = kind.arity();
    if count < min || count > max {
        return Err(ProtocolError::FieldCount { kind, got: count });
    }
    let mut fields: Vec<&str, MAX_FIELDS> = Vec::new();
    for field in parts {
        fields
            .push(field.trim())
            .map_err(|_| ProtocolError::FieldCount { kind, got: count })?;
    }

    let f = Fields { kind, fields: &fields };
    let command = match kind {
        PacketKind::Legacy => Command::Legacy {
            pan_target: f.angle(0)?,
            light: LightMode::from_code(f.int(0, 2, 1)?),
            flags: f.int(0, 255, 2)?,
        },
        PacketKind::Servo => Command::ServoTargets([f.angle(0)?, f.angle(1)?, f.angle(2)?]),
        PacketKind::Light => Command::Light(LightMode::from_code(f.int(0, 2, 0)?)),
        PacketKind::Strip => Command::Strip(StripCommand {
            mode: StripMode::from_code(f.int(0, StripMode::max_code(), 0)?),
            colors: f.colors(1)?,
        }),
        PacketKind::DotMatrix => Command::DotMatrix(DotMatrixCommand {
            left: DotPattern::from_code(f.int(0, DotPattern::max_code(), 0)?),
            right: DotPattern::from_code(f.int(0, DotPattern::max_code(), 1)?),
        }),
        PacketKind::PixelMatrix => Command::PixelMatrix(PixelMatrixCommand {
            mode: PixelMatrixMode::from_code(f.int(0, PixelMatrixMode::max_code(), 0)?),
            glyph: f.glyph(1)?,
            colors: f.colors(2)?,
        }),
        PacketKind::Ring => Command::Ring(RingCommand {
            mode: RingMode::from_code(f.int(0, RingMode::max_code(), 0)?),
            colors: f.colors(1)?,
        }),
        PacketKind::Flags => Command::Flags(f.int(0, 255, 0)?),
        PacketKind::Valve => Command::Valve { open: f.int(0, 1, 0)? == 1 },
        PacketKind::EmergencyStop => Command::ValveEnable(f.int(0, 1, 0)? == 1),
        PacketKind::Acknowledge => Command::AcknowledgeTrip,
    };
    Ok(command)
}

// ═══════════════════════════════════════════════════════════════
//  Field parsing
// ═══════════════════════════════════════════════════════════════

struct Fields<'a> {
    kind: PacketKind,
    fields: &'a [&'a str],
}

impl Fields<'_> {
    fn bad(&self, index: usize) -> ProtocolError {
        ProtocolError::BadField { kind: self.kind, index }
    }

    fn raw(&self, index: usize) -> Option<&str> {
        self.fields.get(index).copied()
    }

    /// Float angle, clamped. NaN is a syntax error.
    fn angle(&self, index: usize) -> Result<f32, ProtocolError> {
        let value: f32 = self
            .raw(index)
            .and_then(|s| s.parse().ok())
            .ok_or(self.bad(index))?;
        if value.is_nan() {
            return Err(self.bad(index));
        }
        Ok(clamp_angle(value))
    }

    /// Integer clamped into `lo..=hi`. Digits too wide for `i64` still
    /// clamp by sign.
    fn int(&self, lo: u8, hi: u8, index: usize) -> Result<u8, ProtocolError> {
        let raw = self.raw(index).ok_or(self.bad(index))?;
        match raw.parse::<i64>() {
            Ok(value) => Ok(value.clamp(i64::from(lo), i64::from(hi)) as u8),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Ok(hi),
                IntErrorKind::NegOverflow => Ok(lo),
                _ => Err(self.bad(index)),
            },
        }
    }

    /// Optional trailing integer.
    fn int_or(&self, lo: u8, hi: u8, index: usize, default: u8) -> Result<u8, ProtocolError> {
        if self.raw(index).is_none() {
            return Ok(default);
        }
        self.int(lo, hi, index)
    }

    fn rgb(&self, index: usize) -> Result<Rgb, ProtocolError> {
        Ok((
            self.int(0, 255, index)?,
            self.int(0, 255, index + 1)?,
            self.int(0, 255, index + 2)?,
        ))
    }

    /// Primary colour at `index`, then optional secondary colour and speed.
    fn colors(&self, index: usize) -> Result<ColorParams, ProtocolError> {
        Ok(ColorParams {
            primary: self.rgb(index)?,
            secondary: (
                self.int_or(0, 255, index + 3, 0)?,
                self.int_or(0, 255, index + 4, 0)?,
                self.int_or(0, 255, index + 5, 0)?,
            ),
            speed: self.int_or(
                ColorParams::MIN_SPEED,
                ColorParams::MAX_SPEED,
                index + 6,
                ColorParams::DEFAULT_SPEED,
            )?,
        })
    }

    /// Exactly one printable ASCII character.
    fn glyph(&self, index: usize) -> Result<u8, ProtocolError> {
        match self.raw(index).map(str::as_bytes) {
            Some(&[c]) if c.is_ascii_graphic() => Ok(c),
            _ => Err(self.bad(index)),
        }
    }
}
