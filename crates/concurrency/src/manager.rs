//! Transaction manager: ids, snapshots, the active set, GC scheduling
//!
//! The manager owns the process-wide transaction counter and the clock
//! that serves both snapshot and commit timestamps. It tracks which
//! transactions are active so garbage collection can compute the oldest
//! snapshot any reader still holds, and rate-limits GC sweeps to a
//! configurable wall-clock interval.

use crate::clock::MonotonicClock;
use crate::transaction::{TransactionContext, TransactionMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Registration record for a live transaction.
#[derive(Debug, Clone, Copy)]
pub struct ActiveTransaction {
    /// The transaction's id.
    pub txn_id: u64,
    /// Snapshot timestamp captured when it opened.
    pub snapshot_ts: u64,
    /// Its access mode.
    pub mode: TransactionMode,
}

/// Coordinates transaction lifecycle across the store.
#[derive(Debug)]
pub struct TransactionManager {
    clock: MonotonicClock,
    next_txn_id: AtomicU64,
    active: Mutex<HashMap<u64, ActiveTransaction>>,
    gc_interval: Duration,
    last_gc: Mutex<u64>,
}

impl TransactionManager {
    /// Create a manager whose GC sweeps are at least `gc_interval` apart.
    pub fn new(gc_interval: Duration) -> Self {
        let clock = MonotonicClock::new();
        let last_gc = clock.now();
        TransactionManager {
            clock,
            next_txn_id: AtomicU64::new(0),
            active: Mutex::new(HashMap::new()),
            gc_interval,
            last_gc: Mutex::new(last_gc),
        }
    }

    /// Open a transaction: allocate the next id, draw a snapshot
    /// timestamp, and register it in the active set.
    pub fn begin(&self, mode: TransactionMode) -> TransactionContext {
        let txn_id = self
            .next_txn_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(1))
            .expect("transaction id overflow: u64::MAX reached")
            + 1;
        let snapshot_ts = self.clock.now();
        self.active.lock().insert(
            txn_id,
            ActiveTransaction {
                txn_id,
                snapshot_ts,
                mode,
            },
        );
        TransactionContext::new(txn_id, snapshot_ts, mode)
    }

    /// Remove a transaction from the active set (commit or rollback).
    pub fn end(&self, txn_id: u64) {
        self.active.lock().remove(&txn_id);
    }

    /// Draw a commit timestamp, strictly above every timestamp handed out
    /// so far (snapshots included).
    pub fn commit_timestamp(&self) -> u64 {
        self.clock.now()
    }

    /// Number of currently active transactions.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Oldest snapshot timestamp among active transactions, if any.
    pub fn min_active_snapshot(&self) -> Option<u64> {
        self.active
            .lock()
            .values()
            .map(|t| t.snapshot_ts)
            .min()
    }

    /// GC pruning threshold: the oldest active snapshot, or the current
    /// clock value when no reader is active (everything old is fair
    /// game).
    pub fn gc_threshold(&self) -> u64 {
        self.min_active_snapshot()
            .unwrap_or_else(|| self.clock.now())
    }

    /// Whether enough wall-clock time has passed for another GC sweep.
    /// Claims the slot when it returns true, so concurrent callers race
    /// for at most one sweep per interval.
    pub fn should_collect(&self) -> bool {
        let now = self.clock.now();
        let mut last = self.last_gc.lock();
        if now.saturating_sub(*last) >= self.gc_interval.as_nanos() as u64 {
            *last = now;
            true
        } else {
            false
        }
    }
}
