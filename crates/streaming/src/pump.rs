//! Stream pump - consumer loop of one streaming channel
//!
//! 一个泛型实现覆盖 scan / imu / camera 三个流。
//!
//! ```text
//! open:  validate(queue_size) ─▶ broker.attach ─▶ ActiveStream
//! run:   loop {
//!            cancelled?            ─▶ break Cancelled
//!            pop ─▶ encode ─▶ write ─▶ (write err ─▶ break PeerDisconnected)
//!            empty ─▶ select!(cancelled | notified | sleep(poll_interval))
//!        }
//!        finish                    ─▶ guard cleared, session metrics closed
//! ```
//!
//! An `ActiveStream` dropped before `run` finishes as `Abandoned`, so every
//! attached session is counted as ended exactly once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use broker::{QueueSize, SensorBroker, SessionId, Subscription};
use contracts::{ChannelKind, Sample, StreamWriter};
use observability::{SessionRecord, SessionStatsAggregator};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::codec::WireCodec;
use crate::metrics::{PumpMetrics, PumpMetricsSnapshot};
use crate::{StreamError, StreamRequest};

/// Pump 配置
#[derive(Debug, Clone, Copy)]
pub struct PumpConfig {
    /// 空队列等待粒度，同时是取消检查的上限延迟
    pub poll_interval: Duration,

    /// 请求未指定 queue_size 时使用
    pub default_queue_size: QueueSize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_micros(1000),
            default_queue_size: QueueSize::DEFAULT,
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Cancellation token fired (peer cancelled or server shutdown)
    Cancelled,
    /// A write failed: the peer is gone
    PeerDisconnected,
    /// Attached but dropped without being run
    Abandoned,
}

impl SessionEnd {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionEnd::Cancelled => "cancelled",
            SessionEnd::PeerDisconnected => "peer_disconnected",
            SessionEnd::Abandoned => "abandoned",
        }
    }
}

/// Completion outcome of one streaming session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub channel: ChannelKind,
    pub session_id: SessionId,
    /// Messages written to the peer
    pub sent: u64,
    /// Samples skipped because they could not be encoded
    pub encode_failures: u64,
    /// Samples evicted by queue overflow during the session
    pub dropped: u64,
    pub duration: Duration,
    pub end: SessionEnd,
}

/// Stream pump of one channel
///
/// Holds no per-session state; every call to [`StreamPump::open`] gets its
/// own queue through a fresh [`Subscription`].
pub struct StreamPump<S: Sample, C: WireCodec<S>> {
    broker: Arc<SensorBroker<S>>,
    codec: C,
    config: PumpConfig,
    metrics: PumpMetrics,
    stats: Arc<Mutex<SessionStatsAggregator>>,
}

impl<S: Sample, C: WireCodec<S>> StreamPump<S, C> {
    /// Create a pump with a private stats aggregator
    pub fn new(broker: Arc<SensorBroker<S>>, codec: C, config: PumpConfig) -> Self {
        Self::with_stats(broker, codec, config, Arc::default())
    }

    /// Create a pump that reports finished sessions into `stats`
    pub fn with_stats(
        broker: Arc<SensorBroker<S>>,
        codec: C,
        config: PumpConfig,
        stats: Arc<Mutex<SessionStatsAggregator>>,
    ) -> Self {
        Self {
            broker,
            codec,
            config,
            metrics: PumpMetrics::new(),
            stats,
        }
    }

    pub fn kind(&self) -> ChannelKind {
        S::KIND
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    pub fn metrics(&self) -> PumpMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Validate the request and attach a new session
    ///
    /// Nothing is written to the peer here; the transport reports an `Err`
    /// as the call status.
    ///
    /// # Errors
    /// - `InvalidArgument`: queue size out of range (broker untouched)
    /// - `Unavailable`: no adapter for the channel
    /// - `ResourceExhausted`: another session is active
    pub fn open(&self, request: &StreamRequest) -> Result<ActiveStream<'_, S, C>, StreamError> {
        let attached =
            QueueSize::from_request_or(request.queue_size, self.config.default_queue_size)
                .map_err(StreamError::from)
                .and_then(|size| self.broker.attach(size).map_err(StreamError::from));

        match attached {
            Ok(subscription) => {
                self.metrics.inc_sessions();
                observability::record_session_started(S::KIND);
                Ok(ActiveStream {
                    pump: self,
                    subscription,
                    started: Instant::now(),
                    finished: false,
                })
            }
            Err(e) => {
                observability::record_session_rejected(S::KIND, e.reason());
                self.stats.lock().record_rejected();
                debug!(channel = %S::KIND, error = %e, "stream request rejected");
                Err(e)
            }
        }
    }

    /// `open` + `run` in one call
    ///
    /// # Errors
    /// See [`StreamPump::open`]; once attached the call always completes with
    /// a summary.
    pub async fn run<W>(
        &self,
        request: &StreamRequest,
        writer: &mut W,
        cancel: &CancellationToken,
    ) -> Result<StreamSummary, StreamError>
    where
        W: StreamWriter<Item = C::Message>,
    {
        let stream = self.open(request)?;
        Ok(stream.run(writer, cancel).await)
    }
}

/// An attached session waiting to be driven
///
/// Dropping it without calling [`ActiveStream::run`] releases the channel
/// and closes the session as [`SessionEnd::Abandoned`].
pub struct ActiveStream<'a, S: Sample, C: WireCodec<S>> {
    pump: &'a StreamPump<S, C>,
    subscription: Subscription<S>,
    started: Instant,
    finished: bool,
}

impl<S: Sample, C: WireCodec<S>> ActiveStream<'_, S, C> {
    pub fn session_id(&self) -> SessionId {
        self.subscription.session_id()
    }

    pub fn capacity(&self) -> usize {
        self.subscription.capacity()
    }

    /// Drive the session until cancellation or a failed write
    ///
    /// Cancellation is checked before every pop and raced against every
    /// write and every empty-queue wait, so it is observed within one
    /// `poll_interval` at worst.
    #[instrument(
        name = "stream_pump_run",
        skip_all,
        fields(channel = %S::KIND, session_id = %self.subscription.session_id(), peer = %writer.peer())
    )]
    pub async fn run<W>(mut self, writer: &mut W, cancel: &CancellationToken) -> StreamSummary
    where
        W: StreamWriter<Item = C::Message>,
    {
        let pump = self.pump;
        let mut sent = 0u64;
        let mut encode_failures = 0u64;

        let end = loop {
            if cancel.is_cancelled() {
                break SessionEnd::Cancelled;
            }

            let Some(sample) = self.subscription.pop() else {
                tokio::select! {
                    _ = cancel.cancelled() => break SessionEnd::Cancelled,
                    _ = self.subscription.notified() => {}
                    _ = tokio::time::sleep(pump.config.poll_interval) => {}
                }
                continue;
            };
            observability::record_queue_depth(S::KIND, self.subscription.len());

            let message = match pump.codec.encode(&sample) {
                Ok(message) => message,
                Err(e) => {
                    encode_failures += 1;
                    pump.metrics.inc_encode_failures();
                    observability::record_encode_failure(S::KIND);
                    warn!(timestamp_us = sample.timestamp_us(), error = %e, "sample skipped");
                    continue;
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break SessionEnd::Cancelled,
                result = writer.write(message) => match result {
                    Ok(()) => {
                        sent += 1;
                        pump.metrics.inc_sent();
                        observability::record_sample_sent(S::KIND);
                    }
                    Err(e) => {
                        pump.metrics.inc_disconnects();
                        debug!(error = %e, "write failed, ending session");
                        break SessionEnd::PeerDisconnected;
                    }
                }
            }
        };

        self.finish(end, sent, encode_failures)
    }

    /// Release the channel and close the session's metrics (once)
    fn finish(&mut self, end: SessionEnd, sent: u64, encode_failures: u64) -> StreamSummary {
        let session_id = self.subscription.session_id();
        let dropped = self.subscription.dropped();
        self.subscription.detach();
        let duration = self.started.elapsed();

        if !self.finished {
            self.finished = true;
            observability::record_session_ended(S::KIND, end.as_str(), duration.as_secs_f64());
            self.pump.stats.lock().update(&SessionRecord {
                channel: S::KIND,
                sent,
                dropped,
                encode_failures,
                duration_secs: duration.as_secs_f64(),
                peer_disconnected: end == SessionEnd::PeerDisconnected,
            });
            info!(
                channel = %S::KIND,
                %session_id,
                sent,
                dropped,
                encode_failures,
                end = end.as_str(),
                duration_ms = duration.as_millis() as u64,
                "stream session finished"
            );
        }

        StreamSummary {
            channel: S::KIND,
            session_id,
            sent,
            encode_failures,
            dropped,
            duration,
            end,
        }
    }
}

impl<S: Sample, C: WireCodec<S>> Drop for ActiveStream<'_, S, C> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(SessionEnd::Abandoned, 0, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{ImuCodec, ScanCodec};
    use crate::writers::ChannelWriter;
    use contracts::{ContractError, ImuMessage, InertialSample, RangeScan, StatusCode};
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    fn imu(ts: u64) -> InertialSample {
        InertialSample {
            timestamp_us: ts,
            accel: [0.0, 0.0, 9.81],
            gyro: [0.0; 3],
        }
    }

    fn imu_pump() -> StreamPump<InertialSample, ImuCodec> {
        StreamPump::new(
            Arc::new(SensorBroker::new(true)),
            ImuCodec,
            PumpConfig::default(),
        )
    }

    /// Writer that fails after `budget` writes
    struct FlakyWriter {
        budget: usize,
        written: Vec<ImuMessage>,
    }

    impl StreamWriter for FlakyWriter {
        type Item = ImuMessage;

        fn peer(&self) -> &str {
            "flaky"
        }

        async fn write(&mut self, item: ImuMessage) -> Result<(), ContractError> {
            if self.written.len() == self.budget {
                return Err(ContractError::transport_write("flaky", "broken pipe"));
            }
            self.written.push(item);
            Ok(())
        }
    }

    #[test]
    fn test_invalid_queue_size_leaves_broker_untouched() {
        let pump = imu_pump();
        for size in [0, 100_001] {
            let err = pump
                .open(&StreamRequest::with_queue_size(size))
                .err()
                .unwrap();
            assert!(matches!(err, StreamError::InvalidArgument { .. }));
        }
        assert!(!pump.broker.is_streaming());
        assert_eq!(pump.broker.metrics().sessions_started, 0);
    }

    #[test]
    fn test_unavailable_channel() {
        let pump: StreamPump<RangeScan, ScanCodec> = StreamPump::new(
            Arc::new(SensorBroker::new(false)),
            ScanCodec,
            PumpConfig::default(),
        );
        let err = pump.open(&StreamRequest::default()).err().unwrap();
        assert!(matches!(err, StreamError::Unavailable { .. }));
    }

    #[test]
    fn test_second_session_exhausted() {
        let pump = imu_pump();
        let first = pump.open(&StreamRequest::default()).unwrap();
        let err = pump.open(&StreamRequest::default()).err().unwrap();
        assert!(matches!(err, StreamError::ResourceExhausted { .. }));
        assert_eq!(err.code(), StatusCode::ResourceExhausted);

        drop(first);
        assert!(pump.open(&StreamRequest::default()).is_ok());
    }

    #[test]
    fn test_default_queue_size_applies() {
        let pump = StreamPump::new(
            Arc::new(SensorBroker::<InertialSample>::new(true)),
            ImuCodec,
            PumpConfig {
                default_queue_size: QueueSize::new(7).unwrap(),
                ..PumpConfig::default()
            },
        );
        assert_eq!(pump.open(&StreamRequest::default()).unwrap().capacity(), 7);
        assert_eq!(
            pump.open(&StreamRequest::with_queue_size(3)).unwrap().capacity(),
            3
        );
    }

    #[tokio::test]
    async fn test_delivers_in_order_then_cancels() {
        let pump = imu_pump();
        let broker = pump.broker.clone();
        let (mut writer, mut rx) = ChannelWriter::pair(64);
        let cancel = CancellationToken::new();

        let stream = pump.open(&StreamRequest::with_queue_size(10)).unwrap();
        for ts in 1..=5 {
            broker.push(imu(ts));
        }

        let run = stream.run(&mut writer, &cancel);
        let consume = async {
            let mut seen = Vec::new();
            while seen.len() < 5 {
                let message = rx.recv().await.unwrap();
                seen.push(message.timestamp);
            }
            cancel.cancel();
            seen
        };
        let (summary, seen) = tokio::join!(run, consume);

        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(summary.sent, 5);
        assert_eq!(summary.end, SessionEnd::Cancelled);
        assert!(!broker.is_streaming());
        assert!(broker.attach(QueueSize::DEFAULT).is_ok());
    }

    #[tokio::test]
    async fn test_overflow_drops_oldest_before_consumer_starts() {
        let pump = imu_pump();
        let broker = pump.broker.clone();
        let (mut writer, mut rx) = ChannelWriter::pair(64);
        let cancel = CancellationToken::new();

        let stream = pump.open(&StreamRequest::with_queue_size(3)).unwrap();
        for ts in 1..=10 {
            broker.push(imu(ts));
        }

        let run = stream.run(&mut writer, &cancel);
        let consume = async {
            let mut seen = Vec::new();
            for _ in 0..3 {
                seen.push(rx.recv().await.unwrap().timestamp);
            }
            cancel.cancel();
            seen
        };
        let (summary, seen) = tokio::join!(run, consume);

        assert_eq!(seen, vec![8, 9, 10]);
        assert_eq!(summary.dropped, 7);
    }

    #[tokio::test]
    async fn test_write_failure_ends_as_disconnect() {
        let pump = imu_pump();
        let broker = pump.broker.clone();
        let mut writer = FlakyWriter {
            budget: 2,
            written: Vec::new(),
        };
        let cancel = CancellationToken::new();

        let stream = pump.open(&StreamRequest::default()).unwrap();
        for ts in 1..=4 {
            broker.push(imu(ts));
        }
        let summary = stream.run(&mut writer, &cancel).await;

        assert_eq!(summary.end, SessionEnd::PeerDisconnected);
        assert_eq!(summary.sent, 2);
        assert_eq!(writer.written.len(), 2);
        assert!(!broker.is_streaming());
        assert_eq!(pump.metrics().disconnects, 1);
    }

    #[tokio::test]
    async fn test_cancel_while_idle_is_prompt() {
        let pump = imu_pump();
        let (mut writer, _rx) = ChannelWriter::pair(1);
        let cancel = CancellationToken::new();
        let stream = pump.open(&StreamRequest::default()).unwrap();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let summary = tokio::time::timeout(Duration::from_secs(2), stream.run(&mut writer, &cancel))
            .await
            .unwrap();
        assert_eq!(summary.end, SessionEnd::Cancelled);
        assert_eq!(summary.sent, 0);
        assert!(pump.broker.attach(QueueSize::DEFAULT).is_ok());
    }

    #[tokio::test]
    async fn test_already_cancelled_token_releases_immediately() {
        let pump = imu_pump();
        let (mut writer, _rx) = ChannelWriter::pair(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = pump
            .run(&StreamRequest::default(), &mut writer, &cancel)
            .await
            .unwrap();
        assert_eq!(summary.end, SessionEnd::Cancelled);
        assert!(!pump.broker.is_streaming());
    }

    #[test]
    fn test_open_then_drop_closes_session_metrics() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let stats = Arc::new(Mutex::new(SessionStatsAggregator::new()));
        let pump = StreamPump::with_stats(
            Arc::new(SensorBroker::<InertialSample>::new(true)),
            ImuCodec,
            PumpConfig::default(),
            stats.clone(),
        );

        ::metrics::with_local_recorder(&recorder, || {
            let stream = pump.open(&StreamRequest::default()).unwrap();
            drop(stream);
        });

        let values: Vec<(String, DebugValue)> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, value)| (key.key().name().to_string(), value))
            .collect();
        let value_of = |name: &str| {
            values
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| match value {
                    DebugValue::Counter(v) => DebugValue::Counter(*v),
                    DebugValue::Gauge(v) => DebugValue::Gauge(*v),
                    DebugValue::Histogram(v) => DebugValue::Histogram(v.clone()),
                })
        };
        assert_eq!(
            value_of("sensor_broker_sessions_active"),
            Some(DebugValue::Gauge(0.0.into()))
        );
        assert_eq!(
            value_of("sensor_broker_sessions_ended_total"),
            Some(DebugValue::Counter(1))
        );

        let summary = stats.lock().summary();
        assert_eq!(summary.total_sessions, 1);
        assert_eq!(summary.total_sent, 0);
        assert!(!pump.broker.is_streaming());
    }

    #[tokio::test]
    async fn test_run_finishes_session_once() {
        let stats = Arc::new(Mutex::new(SessionStatsAggregator::new()));
        let pump = StreamPump::with_stats(
            Arc::new(SensorBroker::<InertialSample>::new(true)),
            ImuCodec,
            PumpConfig::default(),
            stats.clone(),
        );
        let (mut writer, _rx) = ChannelWriter::pair(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = pump
            .run(&StreamRequest::default(), &mut writer, &cancel)
            .await
            .unwrap();
        assert_eq!(summary.end, SessionEnd::Cancelled);
        assert_eq!(stats.lock().summary().total_sessions, 1);
    }

    #[tokio::test]
    async fn test_rejections_are_counted_in_stats() {
        let stats = Arc::new(Mutex::new(SessionStatsAggregator::new()));
        let pump = StreamPump::with_stats(
            Arc::new(SensorBroker::<InertialSample>::new(true)),
            ImuCodec,
            PumpConfig::default(),
            stats.clone(),
        );
        let _held = pump.open(&StreamRequest::default()).unwrap();
        assert!(pump.open(&StreamRequest::default()).is_err());
        assert!(pump.open(&StreamRequest::with_queue_size(0)).is_err());
        assert_eq!(stats.lock().rejected, 2);
    }
}
