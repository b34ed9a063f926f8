//! Lock-guarded state store.
//!
//! The only way to reach [`SharedState`] is
//! [`with_exclusive`](StateStore::with_exclusive), which runs a closure
//! under the lock and never hands out a reference that outlives it. The
//! wait is bounded: a task that cannot get the lock in time skips its
//! state-dependent work for that cycle.

use std::sync::{Mutex, TryLockError};
use std::time::{Duration, Instant};

use log::warn;

use crate::error::LockTimeout;

use super::SharedState;

/// Poll interval while the lock is held elsewhere. One FreeRTOS tick, so
/// a lower-priority holder gets to run and release it.
const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(1);

pub struct StateStore {
    inner: Mutex<SharedState>,
    lock_timeout: Duration,
}

impl StateStore {
    pub fn new(state: SharedState, lock_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(state),
            lock_timeout,
        }
    }

    /// Run `f` with exclusive access, waiting at most the lock timeout.
    ///
    /// A lock poisoned by a panicking task is recovered: every field is
    /// re-evaluated from committed state on the next cycle anyway.
    pub fn with_exclusive<T>(
        &self,
        f: impl FnOnce(&mut SharedState) -> T,
    ) -> Result<T, LockTimeout> {
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match self.inner.try_lock() {
                Ok(mut guard) => return Ok(f(&mut guard)),
                Err(TryLockError::Poisoned(poisoned)) => {
                    warn!("LOCK | state lock poisoned by a panicked task, recovering");
                    let mut guard = poisoned.into_inner();
                    self.inner.clear_poison();
                    return Ok(f(&mut guard));
                }
                Err(TryLockError::WouldBlock) => {}
            }
            if Instant::now() >= deadline {
                return Err(LockTimeout {
                    waited_ms: self.lock_timeout.as_millis() as u32,
                });
            }
            std::thread::sleep(LOCK_RETRY_INTERVAL);
        }
    }
}
