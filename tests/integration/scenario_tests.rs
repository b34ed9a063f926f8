//! End-to-end scenarios: bytes in on the link, servo and valve behaviour
//! and status lines out, with all three tasks running on the rig.

use animatron::app::events::AppEvent;
use animatron::protocol::status::STATUS_MOVING;
use animatron::safety::ForceReason;
use animatron::state::device::{LightMode, ServoId};

use crate::rig::Rig;

fn valve_events(rig: &Rig) -> Vec<AppEvent> {
    rig.events
        .events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                AppEvent::ValveOpened
                    | AppEvent::ValveClosed { .. }
                    | AppEvent::ValveForcedClosed { .. }
            )
        })
        .collect()
}

// ── Legacy command: pan slews toward the target ───────────────

#[test]
fn legacy_command_slews_pan_and_status_tracks_it() {
    let mut rig = Rig::new();
    rig.with_state(|s| {
        s.device.command.servo_targets[ServoId::Pan] = 30.0;
        s.device.output.servo_angles[ServoId::Pan] = 30.0;
    });

    rig.send("$CMD,90.0,1,0\n");
    rig.run_until(33);

    let cmd = rig.with_state(|s| s.device.command);
    assert_eq!(cmd.servo_targets[ServoId::Pan], 90.0);
    assert_eq!(cmd.light_mode, LightMode::On);
    assert_eq!(cmd.flags, 0);
    assert!(cmd.connected);

    rig.run_until(400);
    let lines = rig.status_lines();
    assert!(lines.len() >= 4, "expected a status line every interval, got {lines:?}");

    let pans: Vec<f32> = lines.iter().map(|l| l.pan).collect();
    assert_eq!(pans[0], 30.0, "first status precedes any control cycle");
    assert!(
        pans.windows(2).all(|w| w[1] > w[0] || w[1] == 90.0),
        "pan must rise monotonically until it arrives: {pans:?}"
    );
    for pan in &pans {
        assert_eq!((pan - 30.0) % 2.0, 0.0, "pan {pan} is not a whole number of steps");
    }
    assert_eq!(*pans.last().unwrap(), 90.0);

    assert_ne!(lines[1].flags & STATUS_MOVING, 0, "mid-travel status must flag motion");
    assert_eq!(lines.last().unwrap().flags & STATUS_MOVING, 0);
    assert!(lines[1].light_on);
    assert!(rig.control.actuators().light_on());
    assert_eq!(rig.control.actuators().last_angle(ServoId::Pan), Some(90.0));
}

// ── Valve: reopen waits out the cooldown ──────────────────────

#[test]
fn valve_reopen_is_deferred_until_cooldown_elapses() {
    let mut rig = Rig::new();

    rig.send("$VLV,1\n");
    rig.run_until(40);
    assert!(rig.valve_open());

    rig.send("$VLV,0\n");
    rig.run_until(70);
    assert!(!rig.valve_open());

    rig.send("$VLV,1\n");
    rig.run_until(100);
    assert!(!rig.valve_open(), "open request inside the cooldown must wait");

    // Closed at 70 with a 500 ms cooldown.
    rig.run_until(560);
    assert!(!rig.valve_open());
    rig.run_until(570);
    assert!(rig.valve_open());

    assert_eq!(
        valve_events(&rig),
        vec![
            AppEvent::ValveOpened,
            AppEvent::ValveClosed { open_ms: 30 },
            AppEvent::ValveOpened,
        ]
    );
}

// ── Link loss forces the valve closed ─────────────────────────

#[test]
fn silence_past_timeout_forces_open_valve_closed() {
    let mut rig = Rig::new();

    rig.send("$VLV,1\n");
    rig.run_until(40);
    assert!(rig.valve_open());

    // Last packet applied at 33; 530 - 33 is still inside the timeout.
    rig.run_until(530);
    assert!(rig.valve_open());
    assert!(rig.connected());
    assert_eq!(rig.control.actuators().last_angle(ServoId::Valve), Some(90.0));

    rig.run_until(540);
    assert!(!rig.connected());
    assert!(!rig.valve_open(), "first control cycle past the timeout must close the valve");
    assert_eq!(
        rig.events
            .count(|e| matches!(e, AppEvent::LinkLost { silent_ms: 507 })),
        1
    );
    assert_eq!(
        valve_events(&rig).last(),
        Some(&AppEvent::ValveForcedClosed {
            reason: ForceReason::ConnectionLost,
            open_ms: 500,
        })
    );
    // The valve servo starts back toward the closed angle.
    assert_eq!(rig.control.actuators().last_angle(ServoId::Valve), Some(88.0));

    // No status lines while disconnected.
    rig.status_lines();
    rig.run_until(800);
    assert!(rig.status_lines().is_empty());
    assert_eq!(rig.events.count(|e| matches!(e, AppEvent::LinkLost { .. })), 1);
}

#[test]
fn reconnecting_peer_must_ask_for_the_valve_again() {
    let mut rig = Rig::new();
    rig.send("$VLV,1\n");
    rig.run_until(600);
    assert!(!rig.valve_open());

    rig.send("$LGT,1\n");
    rig.run_until(1200);
    assert!(rig.connected());
    assert!(!rig.valve_open(), "stale open intent must not survive the link loss");
}

// ── Malformed input ───────────────────────────────────────────

#[test]
fn malformed_line_leaves_command_section_unchanged() {
    let mut rig = Rig::new();
    rig.send("$CMD,45.0,2,0\n");
    rig.run_until(40);
    let before = rig.with_state(|s| s.device.command);

    rig.send("$CMD,abc\n");
    rig.run_until(80);

    assert_eq!(rig.with_state(|s| s.device.command), before);
    assert_eq!(
        rig.events
            .count(|e| matches!(e, AppEvent::MalformedPacket(_))),
        1
    );
}

#[test]
fn malformed_first_line_does_not_connect() {
    let mut rig = Rig::new();
    rig.send("$CMD,abc\n$XYZ,1\n");
    rig.run_until(200);
    assert!(!rig.connected());
    assert!(rig.status_lines().is_empty());
    assert_eq!(rig.events.count(|e| matches!(e, AppEvent::LinkEstablished)), 0);
}
