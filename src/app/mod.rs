//! Application core: the three periodic tasks and their ports.
//!
//! The tasks share nothing but the [`StateStore`](crate::state::StateStore).
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], so every task runs unchanged against the mocks in
//! `tests/`.

pub mod animation;
pub mod comm;
pub mod control;
pub mod events;
pub mod ports;
