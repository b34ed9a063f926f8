//! Motion control.

pub mod slew;
