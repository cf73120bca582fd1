//! Producer configuration and metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use broker::PushOutcome;

/// Producer loop configuration
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Sleep after a poll that produced nothing
    pub idle_backoff: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            idle_backoff: Duration::from_micros(1000),
        }
    }
}

impl ProducerConfig {
    pub fn new(idle_backoff: Duration) -> Self {
        Self { idle_backoff }
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total samples received from sources
    pub samples_received: AtomicU64,

    /// Samples stored into a session queue or unary slot
    pub samples_stored: AtomicU64,

    /// Samples stored at the cost of evicting an older one
    pub samples_evicted: AtomicU64,

    /// Samples discarded (no consumer attached)
    pub samples_discarded: AtomicU64,

    /// Polls that returned nothing
    pub idle_polls: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record sample received
    pub fn record_received(&self) {
        self.samples_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record where the sample went
    pub fn record_outcome(&self, outcome: PushOutcome) {
        match outcome {
            PushOutcome::Stored => {
                self.samples_stored.fetch_add(1, Ordering::Relaxed);
            }
            PushOutcome::Dropped => {
                self.samples_stored.fetch_add(1, Ordering::Relaxed);
                self.samples_evicted.fetch_add(1, Ordering::Relaxed);
            }
            PushOutcome::Discarded => {
                self.samples_discarded.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Record empty poll
    pub fn record_idle(&self) {
        self.idle_polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples_received: self.samples_received.load(Ordering::Relaxed),
            samples_stored: self.samples_stored.load(Ordering::Relaxed),
            samples_evicted: self.samples_evicted.load(Ordering::Relaxed),
            samples_discarded: self.samples_discarded.load(Ordering::Relaxed),
            idle_polls: self.idle_polls.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub samples_received: u64,
    pub samples_stored: u64,
    pub samples_evicted: u64,
    pub samples_discarded: u64,
    pub idle_polls: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backoff_is_one_millisecond() {
        assert_eq!(ProducerConfig::default().idle_backoff, Duration::from_millis(1));
    }

    #[test]
    fn test_record_outcomes() {
        let m = IngestionMetrics::new();
        m.record_received();
        m.record_outcome(PushOutcome::Stored);
        m.record_received();
        m.record_outcome(PushOutcome::Dropped);
        m.record_received();
        m.record_outcome(PushOutcome::Discarded);
        m.record_idle();

        assert_eq!(
            m.snapshot(),
            MetricsSnapshot {
                samples_received: 3,
                samples_stored: 2,
                samples_evicted: 1,
                samples_discarded: 1,
                idle_polls: 1,
            }
        );
    }
}
