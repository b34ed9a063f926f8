//! Core-pinned thread spawning for the ESP32 dual-core.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task pinned to a specific CPU core with explicit priority
//! and stack size. On non-ESP targets, falls back to plain thread spawn.
//!
//! # ESP-IDF Threading Model
//!
//! ESP-IDF implements `std::thread` via pthreads, which are thin wrappers
//! around FreeRTOS tasks. `esp_pthread_set_cfg()` sets thread-local
//! configuration that applies to the *next* `pthread_create()` call from
//! the calling thread, so the config→spawn pair must not be interleaved
//! with other thread creation on the same thread.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): UART link and indicator rendering.
    Pro = 0,
    /// Core 1 (APP_CPU): motion control and valve safety.
    App = 1,
}

/// Where and how a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPlacement {
    pub core: Core,
    /// FreeRTOS priority (higher runs first).
    pub priority: u8,
    pub stack_kb: usize,
    /// Null-terminated task name, e.g. `"control\0"`.
    pub name: &'static str,
}

impl TaskPlacement {
    pub fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Spawn a thread with the given placement.
///
/// On ESP-IDF, uses `esp_pthread_set_cfg()` to configure core affinity,
/// priority, and stack size before spawning. On other targets only the
/// stack size is honoured.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    placement: TaskPlacement,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    // SAFETY: the config struct lives on this stack frame for the duration
    // of the call and `name` is a 'static, null-terminated string.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = placement.core as i32;
        cfg.prio = placement.priority as i32;
        cfg.stack_size = (placement.stack_kb * 1024) as _;
        cfg.thread_name = placement.name.as_ptr() as *const _;
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        placement.display_name(),
        placement.core,
        placement.priority,
        placement.stack_kb
    );

    std::thread::Builder::new()
        .name(placement.display_name().into())
        .stack_size(placement.stack_kb * 1024)
        .spawn(f)
}

/// Simulation fallback, ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    placement: TaskPlacement,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        placement.display_name(),
        placement.stack_kb
    );

    std::thread::Builder::new()
        .name(placement.display_name().into())
        .stack_size(placement.stack_kb * 1024)
        .spawn(f)
}
