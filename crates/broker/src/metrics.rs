//! Broker metrics

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::queue::PushOutcome;

/// Per-channel broker counters
#[derive(Debug, Default)]
pub struct BrokerMetrics {
    /// Total samples handed to the broker
    pub pushed: AtomicU64,

    /// Samples stored into a session queue or unary slot
    pub stored: AtomicU64,

    /// Samples stored at the cost of evicting the oldest queued one
    pub evicted: AtomicU64,

    /// Samples discarded because no session was attached
    pub discarded: AtomicU64,

    /// Sessions successfully attached
    pub sessions_started: AtomicU64,

    /// Sessions released
    pub sessions_ended: AtomicU64,

    /// Attach attempts rejected (unavailable, busy, invalid)
    pub sessions_rejected: AtomicU64,
}

impl BrokerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one push
    pub fn record_push(&self, outcome: PushOutcome) {
        self.pushed.fetch_add(1, Ordering::Relaxed);
        match outcome {
            PushOutcome::Stored => {
                self.stored.fetch_add(1, Ordering::Relaxed);
            }
            PushOutcome::Dropped => {
                self.stored.fetch_add(1, Ordering::Relaxed);
                self.evicted.fetch_add(1, Ordering::Relaxed);
            }
            PushOutcome::Discarded => {
                self.discarded.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_ended(&self) {
        self.sessions_ended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_rejected(&self) {
        self.sessions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> BrokerMetricsSnapshot {
        BrokerMetricsSnapshot {
            pushed: self.pushed.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_ended: self.sessions_ended.load(Ordering::Relaxed),
            sessions_rejected: self.sessions_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BrokerMetricsSnapshot {
    pub pushed: u64,
    pub stored: u64,
    pub evicted: u64,
    pub discarded: u64,
    pub sessions_started: u64,
    pub sessions_ended: u64,
    pub sessions_rejected: u64,
}
