//! The three tasks on real threads with the monotonic clock, the way the
//! firmware runs them.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use animatron::adapters::time::MonotonicClock;
use animatron::app::animation::AnimationTask;
use animatron::app::comm::CommTask;
use animatron::app::control::ControlTask;
use animatron::app::events::AppEvent;
use animatron::config::SystemConfig;
use animatron::drivers::task_pin::{Core, TaskPlacement};
use animatron::scheduler::TaskSet;
use animatron::state::device::ServoId;
use animatron::state::{SharedState, StateStore};

use crate::mock_hw::{
    EventLog, RecordingActuators, RecordingIndicators, ScriptedLimit, parse_status, pipe,
};

const fn placement(name: &'static str) -> TaskPlacement {
    TaskPlacement {
        core: Core::Pro,
        priority: 5,
        stack_kb: 64,
        name,
    }
}

#[test]
fn tasks_run_concurrently_and_stop_cleanly() {
    let config = SystemConfig::default();
    let store = Arc::new(StateStore::new(
        SharedState::new(&config),
        Duration::from_millis(u64::from(config.lock_timeout_ms)),
    ));
    let (transport, peer) = pipe();
    let events = EventLog::default();

    let mut tasks = TaskSet::new();
    tasks
        .spawn(
            placement("control\0"),
            ControlTask::new(
                Arc::clone(&store),
                RecordingActuators::default(),
                ScriptedLimit::default(),
                events.clone(),
                &config,
            ),
            MonotonicClock::new(),
        )
        .unwrap();
    tasks
        .spawn(
            placement("comm\0"),
            CommTask::new(Arc::clone(&store), transport, events.clone(), &config),
            MonotonicClock::new(),
        )
        .unwrap();
    tasks
        .spawn(
            placement("animation\0"),
            AnimationTask::new(
                Arc::clone(&store),
                RecordingIndicators::default(),
                events.clone(),
                &config,
            ),
            MonotonicClock::new(),
        )
        .unwrap();
    assert_eq!(tasks.len(), 3);

    peer.send(b"$SRV,100,90,90\n");
    // Five control cycles are enough; leave ample slack for a busy host.
    thread::sleep(Duration::from_millis(400));
    tasks.stop();
    tasks.join();

    let pan = store
        .with_exclusive(|s| s.device.output.servo_angles[ServoId::Pan])
        .unwrap();
    assert_eq!(pan, 100.0);

    let lines = peer.take_lines();
    assert!(!lines.is_empty(), "connected peer must receive status lines");
    assert_eq!(parse_status(lines.last().unwrap()).pan, 100.0);
    assert_eq!(events.count(|e| matches!(e, AppEvent::LinkEstablished)), 1);
}
