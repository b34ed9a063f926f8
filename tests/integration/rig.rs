//! Deterministic test rig: the three tasks over the mock adapters, stepped
//! on a simulated millisecond clock instead of real threads.

use std::sync::Arc;
use std::time::Duration;

use animatron::app::animation::AnimationTask;
use animatron::app::comm::CommTask;
use animatron::app::control::ControlTask;
use animatron::app::ports::Clock;
use animatron::config::SystemConfig;
use animatron::state::{SharedState, StateStore};

use crate::mock_hw::{
    EventLog, ManualClock, PeerEnd, PipeTransport, RecordingActuators, RecordingIndicators,
    ScriptedLimit, StatusLine, parse_status, pipe,
};

pub struct Rig {
    pub config: SystemConfig,
    pub clock: ManualClock,
    pub store: Arc<StateStore>,
    pub peer: PeerEnd,
    pub events: EventLog,
    pub limit: ScriptedLimit,
    pub comm: CommTask<PipeTransport, EventLog>,
    pub control: ControlTask<RecordingActuators, ScriptedLimit, EventLog>,
    pub animation: AnimationTask<RecordingIndicators, EventLog>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    pub fn with_config(config: SystemConfig) -> Self {
        let store = Arc::new(StateStore::new(
            SharedState::new(&config),
            Duration::from_millis(u64::from(config.lock_timeout_ms)),
        ));
        let (transport, peer) = pipe();
        let events = EventLog::default();
        let limit = ScriptedLimit::default();

        Self {
            comm: CommTask::new(Arc::clone(&store), transport, events.clone(), &config),
            control: ControlTask::new(
                Arc::clone(&store),
                RecordingActuators::default(),
                limit.clone(),
                events.clone(),
                &config,
            ),
            animation: AnimationTask::new(
                Arc::clone(&store),
                RecordingIndicators::default(),
                events.clone(),
                &config,
            ),
            clock: ManualClock::new(0),
            config,
            store,
            peer,
            events,
            limit,
        }
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Advance `ms` milliseconds, running each task whenever the clock
    /// lands on a multiple of its period. On a shared tick the order is
    /// comm, control, animation.
    pub fn run_for(&mut self, ms: u64) {
        for _ in 0..ms {
            self.clock.advance(1);
            let now = self.clock.now_ms();
            if now % u64::from(self.config.comm_period_ms) == 0 {
                self.comm.step(now);
            }
            if now % u64::from(self.config.control_period_ms) == 0 {
                self.control.step(now);
            }
            if now % u64::from(self.config.animation_period_ms) == 0 {
                self.animation.step(now);
            }
        }
    }

    /// Run until the clock reads `t_ms`.
    pub fn run_until(&mut self, t_ms: u64) {
        let now = self.now();
        assert!(t_ms >= now, "clock is already at {now}");
        self.run_for(t_ms - now);
    }

    /// Like [`run_until`](Self::run_until), resending `line` every
    /// `every_ms` so the link stays up.
    pub fn run_with_heartbeat(&mut self, t_ms: u64, line: &[u8], every_ms: u64) {
        while self.now() < t_ms {
            self.peer.send(line);
            let next = (self.now() + every_ms).min(t_ms);
            self.run_until(next);
        }
    }

    pub fn send(&self, line: &str) {
        self.peer.send(line.as_bytes());
    }

    pub fn status_lines(&self) -> Vec<StatusLine> {
        self.peer.take_lines().iter().map(|l| parse_status(l)).collect()
    }

    pub fn with_state<T>(&self, f: impl FnOnce(&mut SharedState) -> T) -> T {
        self.store.with_exclusive(f).expect("state lock")
    }

    pub fn valve_open(&self) -> bool {
        self.with_state(|s| s.valve.is_open())
    }

    pub fn connected(&self) -> bool {
        self.with_state(|s| s.device.command.connected)
    }
}
