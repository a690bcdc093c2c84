//! Transaction metrics
//!
//! The TransactionCoordinator counts transactions through their lifecycle:
//! - started (`begin`)
//! - committed (EXEC returned results)
//! - aborted (EXEC refused, or the commit round trip failed)
//! - unreadable (EXEC applied, but its results did not fit the queue)
//! - discarded (`discard`, scoped-helper rollback, shutdown)

use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle counters for one executor
///
/// # Memory Ordering
///
/// All counters use Relaxed ordering. They are observational only and do
/// not synchronize any other memory operations.
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
    total_discarded: AtomicU64,
    total_unreadable: AtomicU64,
}

impl TransactionCoordinator {
    /// Create a coordinator with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record transaction start
    pub fn record_start(&self) {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {
        // saturating: a stray record_* must not wrap the gauge
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
    }

    /// Record transaction commit
    pub fn record_commit(&self) {
        self.finish();
        self.total_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a commit the server refused or that failed in transit
    pub fn record_abort(&self) {
        self.finish();
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a commit the server applied but whose results were unreadable
    ///
    /// Counted apart from commits and aborts: the writes happened, the
    /// caller never saw their results.
    pub fn record_unreadable(&self) {
        self.finish();
        self.total_unreadable.fetch_add(1, Ordering::Relaxed);
    }

    /// Record transaction discard
    pub fn record_discard(&self) {
        self.finish();
        self.total_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current active transaction count
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Get transaction metrics
    pub fn metrics(&self) -> TransactionMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: started,
            total_committed: committed,
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
            total_discarded: self.total_discarded.load(Ordering::Relaxed),
            total_unreadable: self.total_unreadable.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }
}

/// Snapshot of transaction counters
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionMetrics {
    /// Transactions between begin and commit/discard
    pub active_count: u64,
    /// Total transactions started
    pub total_started: u64,
    /// Total transactions committed
    pub total_committed: u64,
    /// Total commits refused or failed
    pub total_aborted: u64,
    /// Total transactions discarded
    pub total_discarded: u64,
    /// Commits applied by the server whose results could not be read
    pub total_unreadable: u64,
    /// committed / started
    pub commit_rate: f64,
}
