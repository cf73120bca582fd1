//! SensorService - every call the transport exposes
//!
//! 三个 streaming 调用共用同一个泛型 `StreamPump`，ADC 走 unary 路径。

use std::sync::Arc;
use std::time::Duration;

use broker::{ChannelRegistry, QueueSize};
use contracts::{
    AdcMessage, CameraMessage, ChannelKind, ImageFrame, ImuMessage, InertialSample,
    PointCloudMessage, RangeScan, ServerConfig, StreamWriter,
};
use observability::{MetricsSummary, SessionStatsAggregator};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::{AdcCodec, CameraCodec, ImuCodec, ScanCodec, WireCodec};
use crate::pump::{ActiveStream, PumpConfig, StreamPump, StreamSummary};
use crate::{AdcRequest, StreamError, StreamRequest};

/// Service 配置
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    pub pump: PumpConfig,

    /// JPEG 编码质量 [1-100]
    pub jpeg_quality: u8,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pump: PumpConfig::default(),
            jpeg_quality: 85,
        }
    }
}

impl ServiceConfig {
    /// Derive from the `[server]` section of a blueprint
    ///
    /// # Errors
    /// `InvalidArgument` when `default_queue_size` is out of range
    pub fn from_server_config(server: &ServerConfig) -> Result<Self, StreamError> {
        let default_queue_size = QueueSize::new(server.default_queue_size)?;
        Ok(Self {
            pump: PumpConfig {
                poll_interval: Duration::from_micros(server.poll_interval_us.max(1)),
                default_queue_size,
            },
            jpeg_quality: server.jpeg_quality,
        })
    }
}

/// Sensor service
///
/// Transport-agnostic: a transport binding supplies a writer and a
/// cancellation token per call.
pub struct SensorService {
    registry: Arc<ChannelRegistry>,
    scan: StreamPump<RangeScan, ScanCodec>,
    imu: StreamPump<InertialSample, ImuCodec>,
    camera: StreamPump<ImageFrame, CameraCodec>,
    stats: Arc<Mutex<SessionStatsAggregator>>,
}

impl SensorService {
    pub fn new(registry: Arc<ChannelRegistry>, config: ServiceConfig) -> Self {
        let stats = Arc::new(Mutex::new(SessionStatsAggregator::new()));
        let service = Self {
            scan: StreamPump::with_stats(
                registry.scan().clone(),
                ScanCodec,
                config.pump,
                stats.clone(),
            ),
            imu: StreamPump::with_stats(registry.imu().clone(), ImuCodec, config.pump, stats.clone()),
            camera: StreamPump::with_stats(
                registry.camera().clone(),
                CameraCodec::new(config.jpeg_quality),
                config.pump,
                stats.clone(),
            ),
            registry,
            stats,
        };
        info!(
            channels = ?service.registry.available_channels(),
            poll_interval_us = config.pump.poll_interval.as_micros() as u64,
            default_queue_size = %config.pump.default_queue_size,
            "sensor service ready"
        );
        service
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Attach a scan session without driving it
    pub fn open_scan(
        &self,
        request: &StreamRequest,
    ) -> Result<ActiveStream<'_, RangeScan, ScanCodec>, StreamError> {
        self.scan.open(request)
    }

    pub fn open_imu(
        &self,
        request: &StreamRequest,
    ) -> Result<ActiveStream<'_, InertialSample, ImuCodec>, StreamError> {
        self.imu.open(request)
    }

    pub fn open_camera(
        &self,
        request: &StreamRequest,
    ) -> Result<ActiveStream<'_, ImageFrame, CameraCodec>, StreamError> {
        self.camera.open(request)
    }

    /// Stream point clouds until cancelled or the peer goes away
    pub async fn stream_scan<W>(
        &self,
        request: &StreamRequest,
        writer: &mut W,
        cancel: &CancellationToken,
    ) -> Result<StreamSummary, StreamError>
    where
        W: StreamWriter<Item = PointCloudMessage>,
    {
        self.scan.run(request, writer, cancel).await
    }

    /// Stream IMU samples until cancelled or the peer goes away
    pub async fn stream_imu<W>(
        &self,
        request: &StreamRequest,
        writer: &mut W,
        cancel: &CancellationToken,
    ) -> Result<StreamSummary, StreamError>
    where
        W: StreamWriter<Item = ImuMessage>,
    {
        self.imu.run(request, writer, cancel).await
    }

    /// Stream JPEG camera frames until cancelled or the peer goes away
    pub async fn stream_camera<W>(
        &self,
        request: &StreamRequest,
        writer: &mut W,
        cancel: &CancellationToken,
    ) -> Result<StreamSummary, StreamError>
    where
        W: StreamWriter<Item = CameraMessage>,
    {
        self.camera.run(request, writer, cancel).await
    }

    /// Latest ADC voltage
    ///
    /// Never touches a session guard, so it cannot conflict with streams.
    ///
    /// # Errors
    /// - `Unavailable`: no ADC adapter
    /// - `NoData`: the adapter has not produced a sample yet
    pub fn read_adc(&self, _request: &AdcRequest) -> Result<AdcMessage, StreamError> {
        let result = self
            .registry
            .adc()
            .read()
            .map_err(StreamError::from)
            .and_then(|latest| {
                latest.ok_or(StreamError::NoData {
                    channel: ChannelKind::Adc,
                })
            })
            .and_then(|sample| AdcCodec.encode(&sample).map_err(StreamError::from));

        match &result {
            Ok(message) => {
                observability::record_unary_read(ChannelKind::Adc, "ok");
                debug!(voltage = message.sample, timestamp = message.timestamp, "adc read");
            }
            Err(e) => {
                observability::record_unary_read(ChannelKind::Adc, e.reason());
                debug!(error = %e, "adc read failed");
            }
        }
        result
    }

    /// Aggregated statistics of finished sessions
    pub fn session_stats(&self) -> MetricsSummary {
        self.stats.lock().summary()
    }
}
