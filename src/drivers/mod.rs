//! Actuator drivers and thread placement helpers.

pub mod rgb;
pub mod servo;
pub mod task_pin;
