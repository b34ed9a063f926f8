//! Animation task (50 Hz).
//!
//! Copies the indicator commands under a very short lock, then renders
//! the time-driven effects and pushes them out without holding it.

use std::sync::Arc;

use crate::config::SystemConfig;
use crate::effects::{EffectEngine, IndicatorFrames, IndicatorInputs};
use crate::scheduler::PeriodicTask;
use crate::state::{SharedState, StateStore};

use super::events::AppEvent;
use super::ports::{EventSink, IndicatorPort};

const TASK_NAME: &str = "animation";

/// Read the fields the effects depend on.
pub fn indicator_inputs(shared: &SharedState) -> IndicatorInputs {
    let cmd = &shared.device.command;
    IndicatorInputs {
        strip: cmd.strip,
        ring: cmd.ring,
        pixel_matrix: cmd.pixel_matrix,
        dot_matrix: cmd.dot_matrix,
        dot_matrix_mode: shared.device.output.dot_matrix_mode,
    }
}

pub struct AnimationTask<I: IndicatorPort, S: EventSink> {
    store: Arc<StateStore>,
    indicators: I,
    events: S,
    engine: EffectEngine,
    period_ms: u64,
    last_frames: Option<IndicatorFrames>,
}

impl<I: IndicatorPort, S: EventSink> AnimationTask<I, S> {
    pub fn new(store: Arc<StateStore>, indicators: I, events: S, config: &SystemConfig) -> Self {
        Self {
            store,
            indicators,
            events,
            engine: EffectEngine::new(),
            period_ms: u64::from(config.animation_period_ms),
            last_frames: None,
        }
    }

    pub fn step(&mut self, now_ms: u64) {
        let inputs = match self.store.with_exclusive(|shared| indicator_inputs(shared)) {
            Ok(inputs) => inputs,
            Err(cause) => {
                self.events.emit(&AppEvent::CycleSkipped {
                    task: TASK_NAME,
                    cause,
                });
                return;
            }
        };

        let frames = self.engine.render(&inputs, now_ms);
        let previous = self.last_frames;

        if previous.is_none_or(|p| p.strip != frames.strip) {
            self.indicators.set_strip(frames.strip);
        }
        if previous.is_none_or(|p| p.ring != frames.ring) {
            self.indicators.show_ring(&frames.ring);
        }
        if previous.is_none_or(|p| p.pixel_matrix != frames.pixel_matrix) {
            self.indicators.show_pixel_matrix(&frames.pixel_matrix);
        }
        if previous.is_none_or(|p| p.dot_matrix != frames.dot_matrix) {
            self.indicators.show_dot_matrix(&frames.dot_matrix);
        }
        self.last_frames = Some(frames);
    }

    pub fn indicators(&self) -> &I {
        &self.indicators
    }
}

impl<I, S> PeriodicTask for AnimationTask<I, S>
where
    I: IndicatorPort + Send,
    S: EventSink + Send,
{
    fn name(&self) -> &'static str {
        TASK_NAME
    }

    fn period_ms(&self) -> u64 {
        self.period_ms
    }

    fn run_cycle(&mut self, now_ms: u64) {
        self.step(now_ms);
    }
}
