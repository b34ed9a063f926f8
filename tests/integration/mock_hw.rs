//! Mock adapters for integration tests.
//!
//! Every mock records what the tasks did to it so tests can assert on the
//! full history without touching real GPIO, PWM or UART registers. The
//! mocks a test needs to inspect after handing them to a task are cheap
//! `Clone` handles onto shared state.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use animatron::app::events::AppEvent;
use animatron::app::ports::{ActuatorPort, Clock, EventSink, IndicatorPort, LimitInput};
use animatron::effects::{DotMatrixFrame, PixelMatrixFrame, RingFrame};
use animatron::protocol::transport::Transport;
use animatron::state::device::{LimitDirection, ServoId};
use animatron::state::peripherals::Rgb;

// ── Clock ─────────────────────────────────────────────────────

/// Clock that only moves when the test says so.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// ── Transport ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Pipe {
    to_device: VecDeque<u8>,
    from_device: Vec<u8>,
    fail_writes: bool,
}

/// Device end of an in-memory serial link.
#[derive(Debug)]
pub struct PipeTransport {
    pipe: Arc<Mutex<Pipe>>,
}

/// Host end of the same link.
#[derive(Debug, Clone)]
pub struct PeerEnd {
    pipe: Arc<Mutex<Pipe>>,
}

pub fn pipe() -> (PipeTransport, PeerEnd) {
    let pipe = Arc::new(Mutex::new(Pipe::default()));
    (
        PipeTransport {
            pipe: Arc::clone(&pipe),
        },
        PeerEnd { pipe },
    )
}

#[allow(dead_code)]
impl PeerEnd {
    pub fn send(&self, bytes: &[u8]) {
        self.pipe.lock().unwrap().to_device.extend(bytes);
    }

    /// Bytes still waiting for the device to read them.
    pub fn unread(&self) -> usize {
        self.pipe.lock().unwrap().to_device.len()
    }

    /// Drain every complete status line the device wrote.
    pub fn take_lines(&self) -> Vec<String> {
        let mut pipe = self.pipe.lock().unwrap();
        let text = String::from_utf8(std::mem::take(&mut pipe.from_device)).unwrap();
        text.lines().map(str::to_owned).collect()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.pipe.lock().unwrap().fail_writes = fail;
    }
}

impl Transport for PipeTransport {
    type Error = &'static str;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut pipe = self.pipe.lock().unwrap();
        let n = buf.len().min(pipe.to_device.len());
        for (slot, byte) in buf.iter_mut().zip(pipe.to_device.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        let mut pipe = self.pipe.lock().unwrap();
        if pipe.fail_writes {
            return Err("link down");
        }
        pipe.from_device.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn available(&self) -> bool {
        !self.pipe.lock().unwrap().to_device.is_empty()
    }
}

// ── Status line parsing ───────────────────────────────────────

/// One decoded `$STS` line.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub limit: u8,
    pub pan: f32,
    pub tilt: f32,
    pub aux: f32,
    pub light_on: bool,
    pub flags: u8,
    pub diagnostic: bool,
    pub valve_open: bool,
    pub valve_enabled: bool,
    pub valve_open_ms: u64,
}

pub fn parse_status(line: &str) -> StatusLine {
    let fields: Vec<&str> = line
        .strip_prefix("$STS,")
        .unwrap_or_else(|| panic!("not a status line: {line:?}"))
        .split(',')
        .collect();
    assert_eq!(fields.len(), 10, "status field count in {line:?}");
    let flag = |i: usize| fields[i] == "1";
    StatusLine {
        limit: fields[0].parse().unwrap(),
        pan: fields[1].parse().unwrap(),
        tilt: fields[2].parse().unwrap(),
        aux: fields[3].parse().unwrap(),
        light_on: flag(4),
        flags: fields[5].parse().unwrap(),
        diagnostic: flag(6),
        valve_open: flag(7),
        valve_enabled: flag(8),
        valve_open_ms: fields[9].parse().unwrap(),
    }
}

// ── Actuators ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCall {
    Servo { id: ServoId, degrees: f32 },
    Light(bool),
    DiagnosticLed(bool),
}

#[derive(Debug, Default)]
pub struct RecordingActuators {
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl RecordingActuators {
    pub fn last_angle(&self, servo: ServoId) -> Option<f32> {
        self.calls.iter().rev().find_map(|c| match *c {
            ActuatorCall::Servo { id, degrees } if id == servo => Some(degrees),
            _ => None,
        })
    }

    pub fn light_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match *c {
                ActuatorCall::Light(on) => Some(on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn diagnostic_led(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match *c {
                ActuatorCall::DiagnosticLed(on) => Some(on),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl ActuatorPort for RecordingActuators {
    fn set_servo_angle(&mut self, id: ServoId, degrees: f32) {
        self.calls.push(ActuatorCall::Servo { id, degrees });
    }

    fn set_light(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Light(on));
    }

    fn set_diagnostic_led(&mut self, on: bool) {
        self.calls.push(ActuatorCall::DiagnosticLed(on));
    }
}

// ── Indicators ────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingIndicators {
    pub strip: Vec<Rgb>,
    pub rings: Vec<RingFrame>,
    pub pixel_matrix: Vec<PixelMatrixFrame>,
    pub dot_matrix: Vec<DotMatrixFrame>,
}

impl IndicatorPort for RecordingIndicators {
    fn set_strip(&mut self, colour: Rgb) {
        self.strip.push(colour);
    }

    fn show_ring(&mut self, frame: &RingFrame) {
        self.rings.push(*frame);
    }

    fn show_pixel_matrix(&mut self, frame: &PixelMatrixFrame) {
        self.pixel_matrix.push(*frame);
    }

    fn show_dot_matrix(&mut self, frame: &DotMatrixFrame) {
        self.dot_matrix.push(*frame);
    }
}

// ── Limit switches ────────────────────────────────────────────

/// Limit input whose reading the test sets directly.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLimit {
    direction: Arc<Mutex<LimitDirection>>,
}

#[allow(dead_code)]
impl ScriptedLimit {
    pub fn set(&self, direction: LimitDirection) {
        *self.direction.lock().unwrap() = direction;
    }
}

impl LimitInput for ScriptedLimit {
    fn sample(&mut self, _now_ms: u64) -> LimitDirection {
        *self.direction.lock().unwrap()
    }
}

// ── Event sink ────────────────────────────────────────────────

/// Collects emitted events; clones share one log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<AppEvent>>>,
}

#[allow(dead_code)]
impl EventLog {
    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &AppEvent) {
        self.events.lock().unwrap().push(*event);
    }
}
