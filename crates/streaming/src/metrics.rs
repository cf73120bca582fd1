//! Stream pump metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters of one stream pump (one channel)
#[derive(Debug, Default)]
pub struct PumpMetrics {
    /// Sessions opened
    sessions: AtomicU64,
    /// Messages written to peers
    sent: AtomicU64,
    /// Samples skipped because encoding failed
    encode_failures: AtomicU64,
    /// Sessions ended by a failed write
    disconnects: AtomicU64,
}

impl PumpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_sessions(&self) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_encode_failures(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_disconnects(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> PumpMetricsSnapshot {
        PumpMetricsSnapshot {
            sessions: self.sessions.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pump metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpMetricsSnapshot {
    pub sessions: u64,
    pub sent: u64,
    pub encode_failures: u64,
    pub disconnects: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pump_metrics_counters() {
        let metrics = PumpMetrics::new();
        metrics.inc_sessions();
        metrics.inc_sent();
        metrics.inc_sent();
        metrics.inc_encode_failures();
        metrics.inc_disconnects();

        assert_eq!(
            metrics.snapshot(),
            PumpMetricsSnapshot {
                sessions: 1,
                sent: 2,
                encode_failures: 1,
                disconnects: 1,
            }
        );
    }
}
