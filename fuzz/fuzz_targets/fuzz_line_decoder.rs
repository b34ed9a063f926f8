//! Fuzz target: `LineReceiver::push` + `decode`
//!
//! Streams arbitrary bytes through the line receiver, decodes every line
//! it hands out and applies the result to a fresh device state. Asserts
//! that nothing panics, no line exceeds the receive buffer, and every
//! accepted servo target is a finite, in-range angle.
//!
//! cargo fuzz run fuzz_line_decoder

#![no_main]

use animatron::config::{SERVO_MAX_ANGLE, SERVO_MIN_ANGLE, SystemConfig};
use animatron::protocol::codec::{LineReceiver, MAX_LINE_LEN};
use animatron::protocol::packet::decode;
use animatron::state::SharedState;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut rx = LineReceiver::new();
    let mut state = SharedState::new(&SystemConfig::default());

    for (t, &byte) in data.iter().enumerate() {
        let Some(line) = rx.push(byte) else {
            continue;
        };
        assert!(line.len() <= MAX_LINE_LEN, "line exceeds receive buffer");
        if let Ok(command) = decode(line) {
            state.apply(&command, t as u64);
        }
    }

    for (_, &angle) in state.device.command.servo_targets.iter() {
        assert!(angle.is_finite());
        assert!((SERVO_MIN_ANGLE..=SERVO_MAX_ANGLE).contains(&angle));
    }

    // A reset always leaves the receiver ready for a clean line.
    rx.reset();
    let _ = rx.take_overflow();
    for &byte in b"$LGT,1\n" {
        if let Some(line) = rx.push(byte) {
            assert!(decode(line).is_ok());
        }
    }
});
