//! Store configuration
//!
//! Nothing is required at construction; the options here cover the
//! garbage-collection cadence and the identifier provider the store asks
//! for fresh document ids.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use vellum_core::{IdProvider, UuidProvider};

/// Minimum wall-clock time between garbage-collection sweeps.
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10);

/// Options recognized at store construction.
#[derive(Clone)]
pub struct StoreConfig {
    /// Minimum interval between version-chain GC sweeps. Sweeps run
    /// opportunistically when transactions end; a zero interval sweeps on
    /// every transaction end (useful in tests).
    pub gc_interval: Duration,
    /// Source of document identifiers for `create`.
    pub id_provider: Arc<dyn IdProvider>,
}

impl StoreConfig {
    /// Configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the GC sweep interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }

    /// Override the identifier provider.
    pub fn with_id_provider(mut self, provider: Arc<dyn IdProvider>) -> Self {
        self.id_provider = provider;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            gc_interval: DEFAULT_GC_INTERVAL,
            id_provider: Arc::new(UuidProvider),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("gc_interval", &self.gc_interval)
            .finish_non_exhaustive()
    }
}
