//! Animatron firmware library.
//!
//! Exposes the task set, state store, protocol codec and safety monitor
//! for integration testing and host simulation. All ESP-IDF-specific code
//! is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod effects;
pub mod error;
pub mod pins;
pub mod protocol;
pub mod safety;
pub mod scheduler;
pub mod sensors;
pub mod state;
