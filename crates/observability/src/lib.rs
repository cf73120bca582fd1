//! # Observability
//!
//! Tracing subscriber + Prometheus exporter for the sensor broker.
//!
//! 所有指标名以 `sensor_broker_` 开头，按 `channel` 打标签：
//!
//! | 指标 | 类型 | 标签 |
//! |---|---|---|
//! | `sensor_broker_samples_pushed_total` | counter | channel, outcome |
//! | `sensor_broker_samples_sent_total` | counter | channel |
//! | `sensor_broker_sessions_started_total` | counter | channel |
//! | `sensor_broker_sessions_ended_total` | counter | channel, reason |
//! | `sensor_broker_sessions_active` | gauge | channel |
//! | `sensor_broker_session_duration_seconds` | histogram | channel |
//! | `sensor_broker_requests_rejected_total` | counter | channel, reason |
//! | `sensor_broker_encode_failures_total` | counter | channel |
//! | `sensor_broker_queue_depth` | gauge | channel |
//! | `sensor_broker_unary_reads_total` | counter | channel, status |
//!
//! ```ignore
//! observability::init_tracing(LogFormat::Compact, "info")?;
//! observability::init_metrics_only(9000)?;
//! observability::record_sample_pushed(ChannelKind::Imu, "stored");
//! ```

pub mod metrics;

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_encode_failure, record_queue_depth, record_sample_pushed, record_sample_sent,
    record_session_ended, record_session_rejected, record_session_started, record_unary_read,
    MetricsSummary, RunningStats, SessionRecord, SessionStatsAggregator, StatsSummary,
};

/// Session 时长直方图分桶 (秒)
///
/// 会话从亚秒级 (测试/探测) 到数小时 (常驻 viewer) 不等。
const SESSION_DURATION_BUCKETS: &[f64] = &[
    0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0, 14400.0,
];

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志 (采集到日志系统)
    #[default]
    Json,
    /// 多行、带源码位置
    Pretty,
    /// 单行
    Compact,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => bail!("unknown log format '{other}' (expected json, pretty or compact)"),
        }
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `default_level`. Fails if a subscriber is already set.
pub fn init_tracing(format: LogFormat, default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("invalid log filter '{default_level}'"))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_thread_names(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_thread_names(true))
            .try_init(),
    };
    installed.context("failed to install tracing subscriber")
}

/// Prometheus exporter only, for callers that already set up tracing
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Full("sensor_broker_session_duration_seconds".to_string()),
            SESSION_DURATION_BUCKETS,
        )
        .context("invalid session duration buckets")?
        .install()
        .with_context(|| format!("failed to install Prometheus exporter on port {port}"))?;

    describe_metrics();
    tracing::info!(port, "prometheus endpoint ready");
    Ok(())
}

fn describe_metrics() {
    use ::metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

    describe_counter!(
        "sensor_broker_samples_pushed_total",
        "Samples handed to the broker by producers, by outcome"
    );
    describe_counter!(
        "sensor_broker_samples_sent_total",
        "Messages written to stream consumers"
    );
    describe_counter!(
        "sensor_broker_sessions_started_total",
        "Stream sessions attached"
    );
    describe_counter!(
        "sensor_broker_sessions_ended_total",
        "Stream sessions finished, by end reason"
    );
    describe_gauge!(
        "sensor_broker_sessions_active",
        "Stream sessions currently attached"
    );
    describe_histogram!(
        "sensor_broker_session_duration_seconds",
        Unit::Seconds,
        "Lifetime of finished stream sessions"
    );
    describe_counter!(
        "sensor_broker_requests_rejected_total",
        "Stream requests refused before a session existed"
    );
    describe_counter!(
        "sensor_broker_encode_failures_total",
        "Samples skipped because they could not be encoded"
    );
    describe_gauge!(
        "sensor_broker_queue_depth",
        "Samples waiting in the active session queue"
    );
    describe_counter!(
        "sensor_broker_unary_reads_total",
        "Latest-value reads, by status"
    );
}
