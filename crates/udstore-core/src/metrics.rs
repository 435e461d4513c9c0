//! Store metrics: connection contention, time under lock, batch and cache
//! effectiveness. Atomics only, so recording never blocks an operation.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters owned by a store.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    lock_wait_us: AtomicU64,
    lock_held_us: AtomicU64,
    batches: AtomicU64,
    rows_attempted: AtomicU64,
    rows_confirmed: AtomicU64,
    cache_skips: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    last_batch_size: AtomicU64,
    max_batch_size: AtomicU64,
}

impl StoreMetrics {
    pub fn add_lock_wait(&self, d: Duration) {
        self.lock_wait_us
            .fetch_add(d.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn add_lock_held(&self, d: Duration) {
        self.lock_held_us
            .fetch_add(d.as_micros() as u64, Ordering::Relaxed);
    }

    /// One physical batch of `rows` statements, `confirmed` of which
    /// affected at least one row.
    pub fn record_batch(&self, rows: usize, confirmed: usize) {
        let n = rows as u64;
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.rows_attempted.fetch_add(n, Ordering::Relaxed);
        self.rows_confirmed
            .fetch_add(confirmed as u64, Ordering::Relaxed);
        self.last_batch_size.store(n, Ordering::Relaxed);
        self.max_batch_size.fetch_max(n, Ordering::Relaxed);
    }

    pub fn record_cache_skips(&self, n: usize) {
        self.cache_skips.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot and optionally reset the counters.
    pub fn snapshot(&self, reset: bool) -> StoreMetricsSnapshot {
        let take = |a: &AtomicU64| {
            if reset {
                a.swap(0, Ordering::Relaxed)
            } else {
                a.load(Ordering::Relaxed)
            }
        };
        let lock_wait_us = take(&self.lock_wait_us);
        let lock_held_us = take(&self.lock_held_us);
        let max_batch_size = take(&self.max_batch_size);

        StoreMetricsSnapshot {
            lock_wait_ms: lock_wait_us / 1000,
            lock_held_ms: lock_held_us / 1000,
            lock_wait_us,
            lock_held_us,
            batches: take(&self.batches),
            rows_attempted: take(&self.rows_attempted),
            rows_confirmed: take(&self.rows_confirmed),
            cache_skips: take(&self.cache_skips),
            commits: take(&self.commits),
            rollbacks: take(&self.rollbacks),
            last_batch_size: take(&self.last_batch_size),
            max_batch_size: if max_batch_size > 0 {
                Some(max_batch_size)
            } else {
                None
            },
        }
    }
}

/// Point-in-time copy of [`StoreMetrics`].
///
/// **Semantics:** `lock_wait_*` is time spent waiting for the connection
/// mutex (contention between worker threads). `lock_held_*` is time the
/// mutex was held, which covers SQLite work plus cache maintenance.
/// `rows_attempted` counts physical statement executions in batches, after
/// cache deduplication removed already-known records (`cache_skips`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreMetricsSnapshot {
    pub lock_wait_ms: u64,
    pub lock_held_ms: u64,
    pub lock_wait_us: u64,
    pub lock_held_us: u64,
    pub batches: u64,
    pub rows_attempted: u64,
    pub rows_confirmed: u64,
    pub cache_skips: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub last_batch_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<u64>,
}
