//! Server run statistics.

use std::time::Duration;

use broker::ChannelStatus;
use ingestion::MetricsSnapshot;
use observability::MetricsSummary;

/// Statistics from one `serve` run
#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    /// Total duration of the run
    pub duration: Duration,

    /// Producer-side counters
    pub ingestion: MetricsSnapshot,

    /// Finished / rejected stream sessions
    pub sessions: MetricsSummary,

    /// Per-channel state at shutdown
    pub channels: Vec<ChannelStatus>,
}

impl ServerStats {
    /// Samples produced per second
    pub fn sample_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ingestion.samples_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Broker Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Producers");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Samples received: {}", self.ingestion.samples_received);
        println!("   ├─ Stored: {}", self.ingestion.samples_stored);
        println!("   ├─ Evicted (queue full): {}", self.ingestion.samples_evicted);
        println!("   ├─ Discarded (no session): {}", self.ingestion.samples_discarded);
        println!("   └─ Rate: {:.2} samples/s", self.sample_rate());

        let s = &self.sessions;
        println!("\n📈 Sessions");
        println!("   ├─ Finished: {}", s.total_sessions);
        println!("   ├─ Rejected: {}", s.rejected);
        println!("   ├─ Peer disconnects: {}", s.disconnects);
        println!("   ├─ Messages sent: {}", s.total_sent);
        println!(
            "   ├─ Dropped by overflow: {} ({:.2}%)",
            s.total_dropped, s.drop_rate
        );
        println!("   └─ Encode failures: {}", s.total_encode_failures);

        if !self.channels.is_empty() {
            println!("\n📡 Channels");
            for (i, channel) in self.channels.iter().enumerate() {
                let prefix = if i == self.channels.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {} ({:?}) available={} pushed={} evicted={}",
                    prefix,
                    channel.kind,
                    channel.mode,
                    channel.available,
                    channel.metrics.pushed,
                    channel.metrics.evicted
                );
            }
        }

        println!();
    }
}
