//! Sensor broker 指标收集模块
//!
//! 通过 `metrics` facade 记录 producer / session / stream 事件，
//! 并提供内存聚合器用于退出时输出摘要。

use std::collections::HashMap;

use contracts::ChannelKind;
use metrics::{counter, gauge, histogram};

/// 记录一次 producer push 的结果
///
/// `outcome`: `stored` / `dropped` / `discarded`
pub fn record_sample_pushed(channel: ChannelKind, outcome: &'static str) {
    counter!(
        "sensor_broker_samples_pushed_total",
        "channel" => channel.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录 session 建立
pub fn record_session_started(channel: ChannelKind) {
    counter!("sensor_broker_sessions_started_total", "channel" => channel.as_str()).increment(1);
    gauge!("sensor_broker_sessions_active", "channel" => channel.as_str()).increment(1.0);
}

/// 记录 session 结束
///
/// `reason`: `cancelled` / `peer_disconnected` / `abandoned`
pub fn record_session_ended(channel: ChannelKind, reason: &'static str, duration_secs: f64) {
    counter!(
        "sensor_broker_sessions_ended_total",
        "channel" => channel.as_str(),
        "reason" => reason
    )
    .increment(1);
    gauge!("sensor_broker_sessions_active", "channel" => channel.as_str()).decrement(1.0);
    histogram!("sensor_broker_session_duration_seconds", "channel" => channel.as_str())
        .record(duration_secs);
}

/// 记录被拒绝的 stream / read 请求
///
/// `reason`: `invalid_argument` / `unavailable` / `resource_exhausted` / ...
pub fn record_session_rejected(channel: ChannelKind, reason: &'static str) {
    counter!(
        "sensor_broker_requests_rejected_total",
        "channel" => channel.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录一条已写出的消息
pub fn record_sample_sent(channel: ChannelKind) {
    counter!("sensor_broker_samples_sent_total", "channel" => channel.as_str()).increment(1);
}

/// 记录编码失败 (该样本被跳过)
pub fn record_encode_failure(channel: ChannelKind) {
    counter!("sensor_broker_encode_failures_total", "channel" => channel.as_str()).increment(1);
}

/// 记录当前 session 队列深度
pub fn record_queue_depth(channel: ChannelKind, depth: usize) {
    gauge!("sensor_broker_queue_depth", "channel" => channel.as_str()).set(depth as f64);
}

/// 记录一次 unary 读取
pub fn record_unary_read(channel: ChannelKind, status: &'static str) {
    counter!(
        "sensor_broker_unary_reads_total",
        "channel" => channel.as_str(),
        "status" => status
    )
    .increment(1);
}

/// 已结束 session 的摘要 (聚合器输入)
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub channel: ChannelKind,
    pub sent: u64,
    pub dropped: u64,
    pub encode_failures: u64,
    pub duration_secs: f64,
    /// 由对端断开 (写失败) 而非取消结束
    pub peer_disconnected: bool,
}

/// Session 指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct SessionStatsAggregator {
    /// 结束的 session 数
    pub total_sessions: u64,

    /// 发送消息总数
    pub total_sent: u64,

    /// 溢出淘汰总数
    pub total_dropped: u64,

    /// 编码失败总数
    pub total_encode_failures: u64,

    /// 由对端断开结束的 session 数
    pub disconnects: u64,

    /// 被拒绝的请求数
    pub rejected: u64,

    /// session 时长统计 (秒)
    pub duration_stats: RunningStats,

    /// 各通道发送数
    pub sent_per_channel: HashMap<ChannelKind, u64>,
}

impl SessionStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, record: &SessionRecord) {
        self.total_sessions += 1;
        self.total_sent += record.sent;
        self.total_dropped += record.dropped;
        self.total_encode_failures += record.encode_failures;
        if record.peer_disconnected {
            self.disconnects += 1;
        }
        self.duration_stats.push(record.duration_secs);
        *self.sent_per_channel.entry(record.channel).or_insert(0) += record.sent;
    }

    /// 记录一次被拒绝的请求
    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let delivered = self.total_sent + self.total_dropped;
        MetricsSummary {
            total_sessions: self.total_sessions,
            total_sent: self.total_sent,
            total_dropped: self.total_dropped,
            total_encode_failures: self.total_encode_failures,
            disconnects: self.disconnects,
            rejected: self.rejected,
            drop_rate: if delivered > 0 {
                self.total_dropped as f64 / delivered as f64 * 100.0
            } else {
                0.0
            },
            session_duration_secs: StatsSummary::from(&self.duration_stats),
            sent_per_channel: self.sent_per_channel.clone(),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_sessions: u64,
    pub total_sent: u64,
    pub total_dropped: u64,
    pub total_encode_failures: u64,
    pub disconnects: u64,
    pub rejected: u64,
    /// dropped / (sent + dropped), 百分比
    pub drop_rate: f64,
    pub session_duration_secs: StatsSummary,
    pub sent_per_channel: HashMap<ChannelKind, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Metrics Summary ===")?;
        writeln!(f, "Sessions: {}", self.total_sessions)?;
        writeln!(f, "Rejected requests: {}", self.rejected)?;
        writeln!(f, "Peer disconnects: {}", self.disconnects)?;
        writeln!(f, "Samples sent: {}", self.total_sent)?;
        writeln!(
            f,
            "Samples dropped: {} ({:.2}%)",
            self.total_dropped, self.drop_rate
        )?;
        writeln!(f, "Encode failures: {}", self.total_encode_failures)?;
        writeln!(f, "Session duration (s): {}", self.session_duration_secs)?;

        if !self.sent_per_channel.is_empty() {
            writeln!(f, "Sent per channel:")?;
            let mut channels: Vec<_> = self.sent_per_channel.iter().collect();
            channels.sort();
            for (channel, count) in channels {
                writeln!(f, "  {}: {}", channel, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
