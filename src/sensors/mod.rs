//! Sensor inputs.
//!
//! The only sensors on this board are the pan travel limit switches.

pub mod limit_switch;
