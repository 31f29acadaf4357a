//! Callback guard serializing multi-source delivery.

use std::sync::{Mutex, PoisonError, TryLockError};
use std::time::Instant;

/// Mutual exclusion around one callback body
///
/// The lock guards no data of its own, so a poisoned lock (a previous body
/// panicked) is recovered instead of propagated.
#[derive(Debug, Default)]
pub struct SynchronizationGuard {
    lock: Mutex<()>,
}

impl SynchronizationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body` with the lock held
    ///
    /// The lock is released when `body` returns, including on `Err` results
    /// and panic unwinds.
    pub fn run<R>(&self, body: impl FnOnce() -> R) -> R {
        let waiting = Instant::now();
        let _held = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        observability::record_guard_wait(waiting.elapsed());
        body()
    }

    /// Whether some body currently holds the lock
    pub fn is_held(&self) -> bool {
        matches!(self.lock.try_lock(), Err(TryLockError::WouldBlock))
    }
}
