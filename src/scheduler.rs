//! Fixed-rate task scheduler.
//!
//! Three periodic tasks run on their own threads and meet only at the
//! shared [`StateStore`](crate::state::StateStore):
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Core 0 (Pro)                    Core 1 (App)                │
//! │                                                              │
//! │  ┌──────────────┐  ┌───────────┐  ┌──────────────────────┐   │
//! │  │ comm ~30 Hz  │  │ anim 50Hz │  │ control 100 Hz       │   │
//! │  │ rx → decode  │  │ effects   │  │ limits, valve, slew  │   │
//! │  │ status → tx  │  │           │  │                      │   │
//! │  └──────┬───────┘  └─────┬─────┘  └──────────┬───────────┘   │
//! │         │                │                   │               │
//! │         ▼                ▼                   ▼               │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │   StateStore::with_exclusive (bounded lock timeout)    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each task runs its cycle body, then sleeps until its next deadline.
//! An overrun skips the missed deadlines instead of bursting to catch up.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::Clock;
use crate::drivers::task_pin::{TaskPlacement, spawn_on_core};

// ═══════════════════════════════════════════════════════════════
//  Periodic task contract
// ═══════════════════════════════════════════════════════════════

/// A unit of periodic work.
pub trait PeriodicTask: Send {
    fn name(&self) -> &'static str;

    fn period_ms(&self) -> u64;

    /// One cycle body. Must not block beyond the bounded state lock.
    fn run_cycle(&mut self, now_ms: u64);
}

// ═══════════════════════════════════════════════════════════════
//  Deadline tracking
// ═══════════════════════════════════════════════════════════════

/// Next-deadline bookkeeping for one task.
#[derive(Debug, Clone)]
pub struct Ticker {
    period_ms: u64,
    next_deadline_ms: u64,
    overruns: u32,
}

impl Ticker {
    pub fn new(period_ms: u64, start_ms: u64) -> Self {
        let period_ms = period_ms.max(1);
        Self {
            period_ms,
            next_deadline_ms: start_ms + period_ms,
            overruns: 0,
        }
    }

    /// How long to sleep after a cycle that finished at `now_ms`.
    ///
    /// Advances the deadline by one period, or past `now_ms` if the cycle
    /// overran; missed deadlines are dropped, not replayed.
    pub fn wait_after(&mut self, now_ms: u64) -> u64 {
        if now_ms >= self.next_deadline_ms {
            let late = now_ms - self.next_deadline_ms;
            self.overruns = self.overruns.saturating_add(1);
            self.next_deadline_ms += (late / self.period_ms + 1) * self.period_ms;
        }
        let wait = self.next_deadline_ms - now_ms;
        self.next_deadline_ms += self.period_ms;
        wait
    }

    /// Cycles that finished at or past their deadline.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }
}

// ═══════════════════════════════════════════════════════════════
//  Task set
// ═══════════════════════════════════════════════════════════════

/// The running task threads.
pub struct TaskSet {
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for TaskSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskSet {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            handles: Vec::new(),
        }
    }

    /// Start `task` on its own thread with the given placement.
    pub fn spawn<T, C>(
        &mut self,
        placement: TaskPlacement,
        mut task: T,
        clock: C,
    ) -> std::io::Result<()>
    where
        T: PeriodicTask + 'static,
        C: Clock + Send + 'static,
    {
        let running = Arc::clone(&self.running);
        let handle = spawn_on_core(placement, move || {
            let name = task.name();
            let mut ticker = Ticker::new(task.period_ms(), clock.now_ms());
            info!("Task '{}' running every {} ms", name, task.period_ms());

            while running.load(Ordering::Acquire) {
                task.run_cycle(clock.now_ms());
                let overruns = ticker.overruns();
                let wait = ticker.wait_after(clock.now_ms());
                if ticker.overruns() != overruns {
                    debug!("Task '{}' overran its period ({} total)", name, ticker.overruns());
                }
                std::thread::sleep(Duration::from_millis(wait));
            }
            info!("Task '{}' stopped", name);
        })?;
        self.handles.push(handle);
        Ok(())
    }

    /// Ask every task to finish its current cycle and exit.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Wait for all task threads. Call after [`stop`](Self::stop).
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                warn!("A task thread panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
