//! Per-peripheral command parameters.
//!
//! Each indicator peripheral has its own mode enum; the wire codes are
//! clamped into range by [`from_code`](StripMode::from_code) so that a
//! decoded packet can never carry an unknown mode.

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

/// Colour pair and speed shared by every animated peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorParams {
    pub primary: Rgb,
    /// Second gradient colour (black when omitted on the wire).
    pub secondary: Rgb,
    /// Animation speed, 1–50.
    pub speed: u8,
}

impl ColorParams {
    pub const MIN_SPEED: u8 = 1;
    pub const MAX_SPEED: u8 = 50;
    pub const DEFAULT_SPEED: u8 = 10;

    pub const fn solid(primary: Rgb) -> Self {
        Self {
            primary,
            secondary: (0, 0, 0),
            speed: Self::DEFAULT_SPEED,
        }
    }
}

impl Default for ColorParams {
    fn default() -> Self {
        Self::solid((0, 0, 0))
    }
}

/// Map a wire code onto an enum, saturating at the last variant.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $code),+
        }

        impl $name {
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Decode a wire code, clamping it into the legal range.
            pub fn from_code(code: u8) -> Self {
                let idx = (code as usize).min(Self::ALL.len() - 1);
                Self::ALL[idx]
            }

            /// Highest legal wire code.
            pub fn max_code() -> u8 {
                (Self::ALL.len() - 1) as u8
            }

            pub const fn code(self) -> u8 {
                self as u8
            }
        }
    };
}

wire_enum! {
    /// RGB strip effect (`RGB` packet).
    StripMode { #[default] Solid = 0, Rainbow = 1, Gradient = 2 }
}

wire_enum! {
    /// Addressable ring effect (`NPR` packet).
    RingMode {
        #[default]
        Off = 0,
        Solid = 1,
        Rainbow = 2,
        Chase = 3,
        Breathe = 4,
        Spinner = 5,
        Gradient = 6,
    }
}

wire_enum! {
    /// 5x5 pixel matrix content (`NPM` packet).
    PixelMatrixMode {
        #[default]
        Off = 0,
        Glyph = 1,
        Scroll = 2,
        Rainbow = 3,
        Solid = 4,
        EyeClosed = 5,
        EyeOpen = 6,
        Circle = 7,
        Cross = 8,
        Gradient = 9,
    }
}

wire_enum! {
    /// One half of the dot-matrix display (`MTX` packet).
    DotPattern { #[default] Off = 0, Circle = 1, Cross = 2 }
}

/// How the dot-matrix display is being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotMatrixMode {
    /// Scrolling text (no pattern selected).
    Scroll,
    /// Static patterns on the two halves.
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StripCommand {
    pub mode: StripMode,
    pub colors: ColorParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingCommand {
    pub mode: RingMode,
    pub colors: ColorParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMatrixCommand {
    pub mode: PixelMatrixMode,
    /// ASCII glyph for `Glyph` mode, or a scroll text id for `Scroll`.
    pub glyph: u8,
    pub colors: ColorParams,
}

impl Default for PixelMatrixCommand {
    fn default() -> Self {
        Self {
            mode: PixelMatrixMode::Off,
            glyph: b'A',
            colors: ColorParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DotMatrixCommand {
    pub left: DotPattern,
    pub right: DotPattern,
}

impl DotMatrixCommand {
    /// Both halves off hands the display back to the scroller.
    pub fn mode(&self) -> DotMatrixMode {
        if self.left == DotPattern::Off && self.right == DotPattern::Off {
            DotMatrixMode::Scroll
        } else {
            DotMatrixMode::Pattern
        }
    }
}
