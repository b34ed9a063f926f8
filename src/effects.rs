//! Time-driven visual effects for the indicator peripherals.
//!
//! The animation task copies the current indicator commands out of the
//! shared state, then asks the engine for the frame at `now_ms`. Every
//! effect is a pure function of the time since its peripheral last
//! changed mode, so a late or skipped frame never desynchronises anything.
//!
//! ## Effects
//!
//! | Effect    | Peripherals          | Rate                         |
//! |-----------|----------------------|------------------------------|
//! | Rainbow   | strip, ring, matrix  | hue step per 20 ms frame     |
//! | Gradient  | strip, ring, matrix  | ping-pong, `speed` per frame |
//! | Breathe   | ring                 | ~1 s triangular ramp         |
//! | Chase     | ring                 | one pixel, 100 ms per step   |
//! | Spinner   | ring                 | two opposite pixels, 50 ms   |
//! | Scroll    | dot matrix           | one column per 80 ms         |

use crate::config::RING_PIXELS;
use crate::state::peripherals::{
    ColorParams, DotMatrixCommand, DotMatrixMode, DotPattern, PixelMatrixCommand,
    PixelMatrixMode, Rgb, RingCommand, RingMode, StripCommand, StripMode,
};

/// Nominal frame period the speeds are expressed against.
const FRAME_MS: u64 = 20;
/// Ping-pong gradient: 0..=255 forward, 256..=510 back.
const GRADIENT_SPAN: u64 = 510;
const RING_RAINBOW_STEP: u64 = 3;
const MATRIX_RAINBOW_STEP: u64 = 10;
const BREATHE_PERIOD_MS: u64 = 1020;
const CHASE_STEP_MS: u64 = 100;
const SPINNER_STEP_MS: u64 = 50;
const SCROLL_STEP_MS: u64 = 80;

const BLACK: Rgb = (0, 0, 0);

pub type RingFrame = [Rgb; RING_PIXELS];

/// What the pixel matrix should show. Glyph rasterisation happens in the
/// matrix driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMatrixFrame {
    pub mode: PixelMatrixMode,
    pub glyph: u8,
    pub colour: Rgb,
}

/// What the dot-matrix display should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotMatrixFrame {
    Patterns { left: DotPattern, right: DotPattern },
    /// Scroll position in columns since the scroller (re)started.
    Scroll { column: u32 },
}

/// Indicator commands copied out under the state lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorInputs {
    pub strip: StripCommand,
    pub ring: RingCommand,
    pub pixel_matrix: PixelMatrixCommand,
    pub dot_matrix: DotMatrixCommand,
    pub dot_matrix_mode: DotMatrixMode,
}

/// One rendered frame for every indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorFrames {
    pub strip: Rgb,
    pub ring: RingFrame,
    pub pixel_matrix: PixelMatrixFrame,
    pub dot_matrix: DotMatrixFrame,
}

/// Start time of the current mode of one peripheral.
#[derive(Debug, Clone, Copy)]
struct Phase<K> {
    key: Option<K>,
    started_ms: u64,
}

impl<K: PartialEq + Copy> Phase<K> {
    const fn new() -> Self {
        Self {
            key: None,
            started_ms: 0,
        }
    }

    /// Time spent in `key`, restarting when it changes.
    fn elapsed(&mut self, key: K, now_ms: u64) -> u64 {
        if self.key != Some(key) {
            self.key = Some(key);
            self.started_ms = now_ms;
        }
        now_ms.saturating_sub(self.started_ms)
    }
}

/// Effect engine. Stack-allocated, no heap.
pub struct EffectEngine {
    strip: Phase<StripMode>,
    ring: Phase<RingMode>,
    matrix: Phase<PixelMatrixMode>,
    scroll: Phase<DotMatrixMode>,
}

impl Default for EffectEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectEngine {
    pub fn new() -> Self {
        Self {
            strip: Phase::new(),
            ring: Phase::new(),
            matrix: Phase::new(),
            scroll: Phase::new(),
        }
    }

    /// Render every indicator at `now_ms`.
    pub fn render(&mut self, inputs: &IndicatorInputs, now_ms: u64) -> IndicatorFrames {
        IndicatorFrames {
            strip: self.strip_colour(&inputs.strip, now_ms),
            ring: self.ring_frame(&inputs.ring, now_ms),
            pixel_matrix: self.pixel_matrix_frame(&inputs.pixel_matrix, now_ms),
            dot_matrix: self.dot_matrix_frame(&inputs.dot_matrix, inputs.dot_matrix_mode, now_ms),
        }
    }

    fn strip_colour(&mut self, cmd: &StripCommand, now_ms: u64) -> Rgb {
        let t = self.strip.elapsed(cmd.mode, now_ms);
        match cmd.mode {
            StripMode::Solid => cmd.colors.primary,
            StripMode::Rainbow => hue_wheel(frames(t).wrapping_mul(u64::from(cmd.colors.speed)) as u8),
            StripMode::Gradient => gradient(&cmd.colors, t),
        }
    }

    fn ring_frame(&mut self, cmd: &RingCommand, now_ms: u64) -> RingFrame {
        let t = self.ring.elapsed(cmd.mode, now_ms);
        let colour = cmd.colors.primary;
        let mut frame = [BLACK; RING_PIXELS];
        match cmd.mode {
            RingMode::Off => {}
            RingMode::Solid => frame = [colour; RING_PIXELS],
            RingMode::Rainbow => {
                let offset = frames(t) * RING_RAINBOW_STEP;
                for (i, px) in frame.iter_mut().enumerate() {
                    let hue = (i as u64 * 256 / RING_PIXELS as u64 + offset) as u8;
                    *px = hue_wheel(hue);
                }
            }
            RingMode::Chase => {
                frame[(t / CHASE_STEP_MS) as usize % RING_PIXELS] = colour;
            }
            RingMode::Breathe => {
                frame = [scale(colour, triangle(t, BREATHE_PERIOD_MS)); RING_PIXELS];
            }
            RingMode::Spinner => {
                let first = (t / SPINNER_STEP_MS) as usize % RING_PIXELS;
                frame[first] = colour;
                frame[(first + RING_PIXELS / 2) % RING_PIXELS] = colour;
            }
            RingMode::Gradient => frame = [gradient(&cmd.colors, t); RING_PIXELS],
        }
        frame
    }

    fn pixel_matrix_frame(&mut self, cmd: &PixelMatrixCommand, now_ms: u64) -> PixelMatrixFrame {
        let t = self.matrix.elapsed(cmd.mode, now_ms);
        let colour = match cmd.mode {
            PixelMatrixMode::Off => BLACK,
            PixelMatrixMode::Rainbow => hue_wheel((frames(t) * MATRIX_RAINBOW_STEP) as u8),
            PixelMatrixMode::Gradient => gradient(&cmd.colors, t),
            _ => cmd.colors.primary,
        };
        PixelMatrixFrame {
            mode: cmd.mode,
            glyph: cmd.glyph,
            colour,
        }
    }

    fn dot_matrix_frame(
        &mut self,
        cmd: &DotMatrixCommand,
        mode: DotMatrixMode,
        now_ms: u64,
    ) -> DotMatrixFrame {
        // Entering scroll mode restarts the text from its first column.
        let t = self.scroll.elapsed(mode, now_ms);
        match mode {
            DotMatrixMode::Pattern => DotMatrixFrame::Patterns {
                left: cmd.left,
                right: cmd.right,
            },
            DotMatrixMode::Scroll => DotMatrixFrame::Scroll {
                column: (t / SCROLL_STEP_MS) as u32,
            },
        }
    }
}

// ── Colour helpers ────────────────────────────────────────────

fn frames(elapsed_ms: u64) -> u64 {
    elapsed_ms / FRAME_MS
}

/// Fully saturated colour wheel, hue 0–255.
pub fn hue_wheel(hue: u8) -> Rgb {
    let sector = hue / 43;
    let rem = (u16::from(hue) - u16::from(sector) * 43) * 6;
    let rise = rem.min(255) as u8;
    let fall = 255 - rise;
    match sector {
        0 => (255, rise, 0),
        1 => (fall, 255, 0),
        2 => (0, 255, rise),
        3 => (0, fall, 255),
        4 => (rise, 0, 255),
        _ => (255, 0, fall),
    }
}

/// Ping-pong blend between primary and secondary at `speed` steps per frame.
fn gradient(colors: &ColorParams, elapsed_ms: u64) -> Rgb {
    let pos = (frames(elapsed_ms) * u64::from(colors.speed)) % GRADIENT_SPAN;
    let t = (if pos <= 255 { pos } else { GRADIENT_SPAN - pos }) as u8;
    lerp_rgb(colors.primary, colors.secondary, t)
}

fn lerp8(a: u8, b: u8, t: u8) -> u8 {
    let a = i32::from(a);
    let delta = i32::from(b) - a;
    (a + delta * i32::from(t) / 255) as u8
}

fn lerp_rgb(from: Rgb, to: Rgb, t: u8) -> Rgb {
    (lerp8(from.0, to.0, t), lerp8(from.1, to.1, t), lerp8(from.2, to.2, t))
}

/// Triangular brightness: ramps 0→255→0 over `period_ms`.
fn triangle(elapsed_ms: u64, period_ms: u64) -> u8 {
    let pos = elapsed_ms % period_ms;
    let half = period_ms / 2;
    if pos < half {
        ((pos * 255) / half) as u8
    } else {
        (((period_ms - pos) * 255) / half).min(255) as u8
    }
}

fn scale(colour: Rgb, brightness: u8) -> Rgb {
    let br = u16::from(brightness);
    (
        ((u16::from(colour.0) * br) / 255) as u8,
        ((u16::from(colour.1) * br) / 255) as u8,
        ((u16::from(colour.2) * br) / 255) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> IndicatorInputs {
        IndicatorInputs {
            strip: StripCommand::default(),
            ring: RingCommand::default(),
            pixel_matrix: PixelMatrixCommand::default(),
            dot_matrix: DotMatrixCommand::default(),
            dot_matrix_mode: DotMatrixMode::Scroll,
        }
    }

    #[test]
    fn solid_strip_returns_exact_colour() {
        let mut engine = EffectEngine::new();
        let mut i = inputs();
        i.strip.colors.primary = (1, 2, 3);
        assert_eq!(engine.render(&i, 0).strip, (1, 2, 3));
        assert_eq!(engine.render(&i, 5000).strip, (1, 2, 3));
    }

    #[test]
    fn off_ring_is_dark() {
        let mut engine = EffectEngine::new();
        let frame = engine.render(&inputs(), 100).ring;
        assert!(frame.iter().all(|px| *px == BLACK));
    }

    #[test]
    fn chase_moves_one_pixel_per_step() {
        let mut engine = EffectEngine::new();
        let mut i = inputs();
        i.ring = RingCommand {
            mode: RingMode::Chase,
            colors: ColorParams::solid((0, 0, 255)),
        };
        let first = engine.render(&i, 1000).ring;
        assert_eq!(first[0], (0, 0, 255));
        let later = engine.render(&i, 1000 + CHASE_STEP_MS).ring;
        assert_eq!(later[0], BLACK);
        assert_eq!(later[1], (0, 0, 255));
    }

    #[test]
    fn spinner_lights_opposite_pixels() {
        let mut engine = EffectEngine::new();
        let mut i = inputs();
        i.ring.mode = RingMode::Spinner;
        i.ring.colors.primary = (9, 9, 9);
        let frame = engine.render(&i, 0).ring;
        assert_eq!(frame[0], (9, 9, 9));
        assert_eq!(frame[RING_PIXELS / 2], (9, 9, 9));
        assert_eq!(frame.iter().filter(|px| **px != BLACK).count(), 2);
    }

    #[test]
    fn gradient_ping_pongs_between_colours() {
        let colors = ColorParams {
            primary: (0, 0, 0),
            secondary: (255, 255, 255),
            speed: 51,
        };
        assert_eq!(gradient(&colors, 0), (0, 0, 0));
        // 5 frames * 51 = 255: fully at the second colour.
        assert_eq!(gradient(&colors, 5 * FRAME_MS), (255, 255, 255));
        // 10 frames * 51 = 510: back at the start.
        assert_eq!(gradient(&colors, 10 * FRAME_MS), (0, 0, 0));
    }

    #[test]
    fn breathe_ramps_up_then_down() {
        assert_eq!(triangle(0, BREATHE_PERIOD_MS), 0);
        assert_eq!(triangle(BREATHE_PERIOD_MS / 2, BREATHE_PERIOD_MS), 255);
        assert!(triangle(BREATHE_PERIOD_MS / 4, BREATHE_PERIOD_MS) > 100);
    }

    #[test]
    fn hue_wheel_hits_primaries() {
        assert_eq!(hue_wheel(0), (255, 0, 0));
        assert_eq!(hue_wheel(86).1, 255);
        assert_eq!(hue_wheel(172).2, 255);
    }

    #[test]
    fn scroll_restarts_on_mode_switch() {
        let mut engine = EffectEngine::new();
        let mut i = inputs();
        engine.render(&i, 0);
        assert_eq!(
            engine.render(&i, 800).dot_matrix,
            DotMatrixFrame::Scroll { column: 10 }
        );

        i.dot_matrix.left = DotPattern::Circle;
        i.dot_matrix_mode = DotMatrixMode::Pattern;
        assert_eq!(
            engine.render(&i, 900).dot_matrix,
            DotMatrixFrame::Patterns {
                left: DotPattern::Circle,
                right: DotPattern::Off
            }
        );

        i.dot_matrix = DotMatrixCommand::default();
        i.dot_matrix_mode = DotMatrixMode::Scroll;
        assert_eq!(
            engine.render(&i, 1000).dot_matrix,
            DotMatrixFrame::Scroll { column: 0 }
        );
    }
}
