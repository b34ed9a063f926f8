//! Link-level behaviour of the communication task: framing across reads,
//! receive overflow reporting, lock contention, and the valve commands
//! that act immediately (emergency stop, trip acknowledge).

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use animatron::app::events::AppEvent;
use animatron::protocol::status::{STATUS_RX_OVERFLOW, STATUS_VALVE_TRIPPED};
use animatron::safety::ForceReason;
use animatron::state::device::{LightMode, ServoId};

use crate::rig::Rig;

#[test]
fn line_split_across_reads_is_reassembled() {
    let mut rig = Rig::new();
    rig.send("$SR");
    rig.run_until(33);
    assert!(!rig.connected());

    rig.send("V,10,20,30\n");
    rig.run_until(66);
    let targets = rig.with_state(|s| s.device.command.servo_targets);
    assert_eq!(targets[ServoId::Pan], 10.0);
    assert_eq!(targets[ServoId::Tilt], 20.0);
    assert_eq!(targets[ServoId::Aux], 30.0);
}

#[test]
fn commands_in_one_burst_apply_in_arrival_order() {
    let mut rig = Rig::new();
    rig.send("$LGT,1\n$LGT,0\n$LGT,2\n");
    rig.run_until(33);
    assert_eq!(rig.with_state(|s| s.device.command.light_mode), LightMode::Auto);
    assert_eq!(rig.events.count(|e| matches!(e, AppEvent::LinkEstablished)), 1);
}

#[test]
fn long_burst_is_drained_over_several_cycles() {
    let mut rig = Rig::new();
    for _ in 0..40 {
        rig.send("$FLG,2\n");
    }
    rig.run_until(33);
    assert!(rig.peer.unread() > 0, "one cycle must not read past the queue bound");
    assert_eq!(rig.comm.pending(), 0);

    rig.run_until(33 * 40);
    assert_eq!(rig.peer.unread(), 0);
    assert_eq!(rig.with_state(|s| s.device.command.flags), 2);
}

#[test]
fn overflow_is_flagged_in_the_next_status_only() {
    let mut rig = Rig::new();
    let mut noise = String::from("$");
    noise.push_str(&"A".repeat(100));
    noise.push('\n');
    rig.send(&noise);
    rig.send("$LGT,1\n");

    rig.run_until(120);
    let lines = rig.status_lines();
    assert!(lines.len() >= 2);
    assert_ne!(lines[0].flags & STATUS_RX_OVERFLOW, 0);
    assert_eq!(lines[1].flags & STATUS_RX_OVERFLOW, 0);
    assert_eq!(rig.events.count(|e| matches!(e, AppEvent::RxOverflow)), 1);
    assert_eq!(rig.with_state(|s| s.device.command.light_mode), LightMode::On);
}

#[test]
fn status_lines_hold_the_configured_rate() {
    let mut rig = Rig::new();
    assert_eq!(rig.config.status_interval_ms, 50);
    rig.run_with_heartbeat(1000, b"$LGT,1\n", 100);
    let n = rig.status_lines().len();
    // First line at 33, then on a 50 ms grid checked every 33 ms.
    assert!((19..=21).contains(&n), "{n} status lines in one second");
}

#[test]
fn failed_status_write_is_reported() {
    let mut rig = Rig::new();
    rig.peer.fail_writes(true);
    rig.send("$LGT,1\n");
    rig.run_until(40);
    assert_eq!(rig.events.count(|e| matches!(e, AppEvent::TxFailed)), 1);
    // The command itself still went through.
    assert!(rig.connected());
}

#[test]
fn busy_lock_skips_the_cycle_and_keeps_commands_queued() {
    let mut rig = Rig::new();
    rig.send("$SRV,100,90,90\n");

    let store = rig.store.clone();
    let (held_tx, held_rx) = mpsc::channel();
    let holder = thread::spawn(move || {
        store
            .with_exclusive(|_| {
                held_tx.send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
            })
            .unwrap();
    });
    held_rx.recv().unwrap();

    rig.comm.step(33);
    assert_eq!(rig.comm.pending(), 1);
    assert_eq!(
        rig.events
            .count(|e| matches!(e, AppEvent::CycleSkipped { task: "comm", .. })),
        1
    );
    holder.join().unwrap();

    rig.comm.step(66);
    assert_eq!(rig.comm.pending(), 0);
    assert_eq!(
        rig.with_state(|s| s.device.command.servo_targets[ServoId::Pan]),
        100.0
    );
}

#[test]
fn emergency_stop_closes_before_the_next_control_cycle() {
    let mut rig = Rig::new();
    rig.send("$VLV,1\n");
    rig.run_until(40);
    assert!(rig.valve_open());

    rig.send("$EST,0\n");
    rig.run_until(66);
    assert!(!rig.valve_open(), "stop must not wait for the control task");
    assert_eq!(
        rig.events
            .count(|e| matches!(e, AppEvent::EmergencyStop { engaged: true })),
        1
    );
    assert_eq!(
        rig.events.count(|e| matches!(
            e,
            AppEvent::ValveForcedClosed {
                reason: ForceReason::EmergencyStop,
                ..
            }
        )),
        1
    );

    rig.run_with_heartbeat(400, b"$VLV,1\n", 100);
    assert!(!rig.valve_open());
    let last = rig.status_lines().pop().unwrap();
    assert!(!last.valve_enabled);
    assert!(!last.valve_open);

    // Released; closed at 66, so the cooldown is long over by 600.
    rig.send("$EST,1\n");
    rig.run_with_heartbeat(600, b"$VLV,1\n", 100);
    assert!(rig.valve_open());
}

#[test]
fn max_open_trip_latches_until_acknowledged() {
    let mut rig = Rig::new();
    rig.run_with_heartbeat(5100, b"$VLV,1\n", 100);
    assert!(!rig.valve_open());
    assert!(rig.with_state(|s| s.valve.state().safety_triggered));
    assert_eq!(
        rig.events.count(|e| matches!(
            e,
            AppEvent::ValveForcedClosed {
                reason: ForceReason::MaxOpenExceeded,
                open_ms: 5000,
            }
        )),
        1
    );

    rig.run_with_heartbeat(6000, b"$VLV,1\n", 100);
    assert!(!rig.valve_open(), "trip must hold while the peer keeps asking");
    let last = rig.status_lines().pop().unwrap();
    assert_ne!(last.flags & STATUS_VALVE_TRIPPED, 0);

    rig.send("$ACK\n");
    rig.run_with_heartbeat(6100, b"$VLV,1\n", 100);
    assert!(rig.valve_open());
    assert_eq!(
        rig.events
            .count(|e| matches!(e, AppEvent::ValveTripAcknowledged)),
        1
    );
}

#[test]
fn diagnostic_request_holds_for_the_configured_window() {
    let mut rig = Rig::new();
    rig.send("$FLG,1\n");
    rig.run_until(100);
    assert!(rig.control.actuators().diagnostic_led());
    assert!(rig.status_lines().iter().any(|l| l.diagnostic));

    // Requested at 33, held for 1000 ms.
    rig.run_with_heartbeat(1030, b"$LGT,0\n", 100);
    assert!(rig.control.actuators().diagnostic_led());
    rig.run_with_heartbeat(1100, b"$LGT,0\n", 100);
    assert!(!rig.control.actuators().diagnostic_led());
    assert!(!rig.status_lines().last().unwrap().diagnostic);
}
