//! Strictly monotonic timestamp source
//!
//! Snapshot and commit timestamps share one process-wide clock. Every
//! draw returns a value strictly greater than every earlier draw, even
//! when the wall clock stalls or steps backwards, which keeps version
//! chains strictly decreasing and makes commits linearizable against
//! transaction opens: a transaction opened after a commit always receives
//! a snapshot timestamp above that commit's timestamp.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock nanoseconds bumped by at least one per draw.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    /// Create a clock; the first draw is at or after the current wall time.
    pub fn new() -> Self {
        MonotonicClock {
            last: AtomicU64::new(0),
        }
    }

    /// Draw the next timestamp: `max(wall_clock_ns, previous + 1)`.
    ///
    /// # Panics
    ///
    /// Panics if the counter reaches `u64::MAX` (some 500 years of
    /// nanoseconds).
    pub fn now(&self) -> u64 {
        let wall = wall_clock_ns();
        let prev = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(wall.max(last.checked_add(1).expect("timestamp counter overflow")))
            })
            .expect("fetch_update closure never returns None");
        wall.max(prev + 1)
    }

    /// The most recently drawn timestamp, without advancing the clock.
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

fn wall_clock_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
