//! Per-date schedule lock + concurrent-solve cap (C10).
//!
//! Two distinct guards are needed: only one solve may run against a given
//! date at a time (a re-optimize racing a generate would corrupt the
//! persisted schedule), and the whole process caps how many solves run at
//! once regardless of date (the solver is CPU-bound). `try_acquire` is
//! non-blocking by design — the HTTP layer maps a missed acquire straight to
//! a 503 Busy response rather than queuing the request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};

/// Holds both the per-date lock and a solve-concurrency permit for as long
/// as a solve is in flight. Dropping it releases both.
pub struct ScheduleLockGuard {
    _permit: OwnedSemaphorePermit,
    _date_guard: OwnedMutexGuard<()>,
}

/// Holds just a solve-concurrency permit — for read-only solves (preview)
/// that don't need to exclude a concurrent write against the same date.
pub struct SolvePermit {
    _permit: OwnedSemaphorePermit,
}

/// Registry of per-date advisory locks plus a global solve-concurrency
/// semaphore. Cloneable; all clones share the same underlying state.
#[derive(Clone)]
pub struct ScheduleLockRegistry {
    locks: Arc<Mutex<HashMap<NaiveDate, Arc<AsyncMutex<()>>>>>,
    solve_semaphore: Arc<Semaphore>,
}

impl ScheduleLockRegistry {
    pub fn new(max_concurrent_solves: usize) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            solve_semaphore: Arc::new(Semaphore::new(max_concurrent_solves.max(1))),
        }
    }

    fn date_mutex(&self, date: NaiveDate) -> Arc<AsyncMutex<()>> {
        self.locks.lock().entry(date).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Attempts to acquire both the per-date lock and a concurrency permit
    /// without waiting. `None` means a solve for this date is already
    /// running, or the process is already at its concurrent-solve cap — the
    /// caller should answer with `ApiError::Busy`.
    pub fn try_acquire(&self, date: NaiveDate) -> Option<ScheduleLockGuard> {
        let permit = self.solve_semaphore.clone().try_acquire_owned().ok()?;
        let date_mutex = self.date_mutex(date);
        let date_guard = date_mutex.try_lock_owned().ok()?;
        Some(ScheduleLockGuard { _permit: permit, _date_guard: date_guard })
    }

    /// Concurrency-only acquire for read-only solves (preview) that must
    /// still respect the process-wide solve cap but don't touch persisted
    /// state, so they don't need to exclude a concurrent write.
    pub fn try_acquire_permit(&self) -> Option<SolvePermit> {
        let permit = self.solve_semaphore.clone().try_acquire_owned().ok()?;
        Some(SolvePermit { _permit: permit })
    }

    /// Number of date entries ever touched. Entries are never evicted — the
    /// set of distinct dates dispatched against in a process lifetime is
    /// small enough that this is not worth pruning.
    #[cfg(test)]
    fn tracked_dates(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    #[test]
    fn try_acquire_succeeds_for_distinct_dates() {
        let registry = ScheduleLockRegistry::new(4);
        let a = registry.try_acquire(date(1));
        let b = registry.try_acquire(date(2));
        assert!(a.is_some());
        assert!(b.is_some());
        assert_eq!(registry.tracked_dates(), 2);
    }

    #[test]
    fn try_acquire_fails_while_same_date_is_locked() {
        let registry = ScheduleLockRegistry::new(4);
        let _first = registry.try_acquire(date(1)).expect("first acquire succeeds");
        assert!(registry.try_acquire(date(1)).is_none());
    }

    #[test]
    fn dropping_the_guard_releases_the_date_lock() {
        let registry = ScheduleLockRegistry::new(4);
        {
            let _first = registry.try_acquire(date(1)).expect("first acquire succeeds");
        }
        assert!(registry.try_acquire(date(1)).is_some());
    }

    #[test]
    fn try_acquire_fails_once_concurrency_cap_is_reached() {
        let registry = ScheduleLockRegistry::new(1);
        let _first = registry.try_acquire(date(1)).expect("first acquire succeeds");
        assert!(registry.try_acquire(date(2)).is_none());
    }
}
