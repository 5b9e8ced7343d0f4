//! Dispatch metrics for observability

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a single processor
#[derive(Debug, Default)]
pub struct ProcessorMetrics {
    /// Total successful sends
    sent_count: AtomicU64,
    /// Total failed sends (false or error)
    failure_count: AtomicU64,
}

impl ProcessorMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total sent count
    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    /// Increment sent count
    pub fn inc_sent_count(&self) {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get failure count
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Increment failure count
    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sent_count: self.sent_count(),
            failure_count: self.failure_count(),
        }
    }
}

/// Snapshot of processor metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sent_count: u64,
    pub failure_count: u64,
}

/// Dispatcher-wide counters
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    submitted: AtomicU64,
    recorded: AtomicU64,
    buffered: AtomicU64,
    dispatched: AtomicU64,
    replayed: AtomicU64,
    discarded: AtomicU64,
    events_emitted: AtomicU64,
    marked_read: AtomicU64,
    state_unknown: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_recorded(&self) {
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_buffered(&self) {
        self.buffered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_replayed(&self, n: usize) {
        self.replayed.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_discarded(&self, n: usize) {
        self.discarded.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn inc_events_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_marked_read(&self) {
        self.marked_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_state_unknown(&self) {
        self.state_unknown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            recorded: self.recorded.load(Ordering::Relaxed),
            buffered: self.buffered.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            marked_read: self.marked_read.load(Ordering::Relaxed),
            state_unknown: self.state_unknown.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher-wide counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    /// Accepted submissions (after validation)
    pub submitted: u64,
    /// Empty-processor-list submissions
    pub recorded: u64,
    /// Submissions deferred to a transaction buffer
    pub buffered: u64,
    /// Fan-outs run, synchronous and replayed
    pub dispatched: u64,
    /// Buffered messages replayed after commit
    pub replayed: u64,
    /// Buffered messages dropped on rollback
    pub discarded: u64,
    pub events_emitted: u64,
    /// Successful read-marking calls
    pub marked_read: u64,
    /// Times the transaction state could not be determined
    pub state_unknown: u64,
}
