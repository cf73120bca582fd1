//! Channel registry - one broker per channel kind

use std::sync::Arc;

use contracts::{
    AnalogSample, ChannelKind, ChannelMode, ImageFrame, InertialSample, RangeScan, SensorSample,
};
use serde::Serialize;
use tracing::{info, trace};

use crate::metrics::BrokerMetricsSnapshot;
use crate::queue::PushOutcome;
use crate::session::SessionId;
use crate::SensorBroker;

/// Per-channel status summary
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub kind: ChannelKind,
    pub mode: ChannelMode,
    pub available: bool,
    pub active_session: Option<SessionId>,
    pub queue_depth: usize,
    pub metrics: BrokerMetricsSnapshot,
}

/// Maps channel kind → broker
///
/// Created at process start and shared (`Arc`) by producers and the stream
/// service. Channel availability never changes after construction.
#[derive(Debug)]
pub struct ChannelRegistry {
    scan: Arc<SensorBroker<RangeScan>>,
    imu: Arc<SensorBroker<InertialSample>>,
    adc: Arc<SensorBroker<AnalogSample>>,
    camera: Arc<SensorBroker<ImageFrame>>,
}

impl ChannelRegistry {
    /// Create a registry where exactly the kinds in `available` have an adapter
    pub fn new(available: &[ChannelKind]) -> Self {
        let has = |kind| available.contains(&kind);
        let registry = Self {
            scan: Arc::new(SensorBroker::new(has(ChannelKind::Scan))),
            imu: Arc::new(SensorBroker::new(has(ChannelKind::Imu))),
            adc: Arc::new(SensorBroker::new(has(ChannelKind::Adc))),
            camera: Arc::new(SensorBroker::new(has(ChannelKind::Camera))),
        };
        info!(
            available = ?registry.available_channels(),
            "channel registry created"
        );
        registry
    }

    pub fn scan(&self) -> &Arc<SensorBroker<RangeScan>> {
        &self.scan
    }

    pub fn imu(&self) -> &Arc<SensorBroker<InertialSample>> {
        &self.imu
    }

    pub fn adc(&self) -> &Arc<SensorBroker<AnalogSample>> {
        &self.adc
    }

    pub fn camera(&self) -> &Arc<SensorBroker<ImageFrame>> {
        &self.camera
    }

    /// Route a sample to the broker of its kind
    pub fn push(&self, sample: SensorSample) -> PushOutcome {
        let outcome = match sample {
            SensorSample::Scan(s) => self.scan.push(s),
            SensorSample::Imu(s) => self.imu.push(s),
            SensorSample::Adc(s) => self.adc.push(s),
            SensorSample::Camera(s) => self.camera.push(s),
        };
        if outcome == PushOutcome::Dropped {
            trace!("queue full, oldest sample evicted");
        }
        outcome
    }

    pub fn is_available(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Scan => self.scan.is_available(),
            ChannelKind::Imu => self.imu.is_available(),
            ChannelKind::Adc => self.adc.is_available(),
            ChannelKind::Camera => self.camera.is_available(),
        }
    }

    pub fn is_streaming(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Scan => self.scan.is_streaming(),
            ChannelKind::Imu => self.imu.is_streaming(),
            ChannelKind::Adc => self.adc.is_streaming(),
            ChannelKind::Camera => self.camera.is_streaming(),
        }
    }

    pub fn available_channels(&self) -> Vec<ChannelKind> {
        ChannelKind::ALL
            .into_iter()
            .filter(|k| self.is_available(*k))
            .collect()
    }

    /// Status of one channel
    pub fn channel_status(&self, kind: ChannelKind) -> ChannelStatus {
        match kind {
            ChannelKind::Scan => status_of(&self.scan),
            ChannelKind::Imu => status_of(&self.imu),
            ChannelKind::Adc => status_of(&self.adc),
            ChannelKind::Camera => status_of(&self.camera),
        }
    }

    /// Status of all channels, in `ChannelKind::ALL` order
    pub fn status(&self) -> Vec<ChannelStatus> {
        ChannelKind::ALL
            .into_iter()
            .map(|k| self.channel_status(k))
            .collect()
    }
}

fn status_of<S: contracts::Sample>(broker: &SensorBroker<S>) -> ChannelStatus {
    ChannelStatus {
        kind: broker.kind(),
        mode: broker.kind().mode(),
        available: broker.is_available(),
        active_session: broker.active_session(),
        queue_depth: broker.queue_depth(),
        metrics: broker.metrics(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BrokerError, QueueSize};
    use bytes::Bytes;
    use contracts::PixelFormat;

    fn imu(ts: u64) -> SensorSample {
        InertialSample {
            timestamp_us: ts,
            ..Default::default()
        }
        .into()
    }

    #[test]
    fn test_availability_fixed_at_construction() {
        let registry = ChannelRegistry::new(&[ChannelKind::Imu, ChannelKind::Adc]);
        assert!(registry.is_available(ChannelKind::Imu));
        assert!(registry.is_available(ChannelKind::Adc));
        assert!(!registry.is_available(ChannelKind::Scan));
        assert!(!registry.is_available(ChannelKind::Camera));
        assert_eq!(
            registry.available_channels(),
            vec![ChannelKind::Imu, ChannelKind::Adc]
        );
    }

    #[test]
    fn test_unavailable_independent_of_other_channels() {
        let registry = ChannelRegistry::new(&[ChannelKind::Imu]);
        let _imu_sub = registry.imu().attach(QueueSize::DEFAULT).unwrap();

        for _ in 0..3 {
            assert_eq!(
                registry.scan().attach(QueueSize::DEFAULT).unwrap_err(),
                BrokerError::Unavailable {
                    channel: ChannelKind::Scan
                }
            );
        }
        assert!(matches!(
            registry.adc().read(),
            Err(BrokerError::Unavailable { .. })
        ));
        assert!(registry.is_streaming(ChannelKind::Imu));
    }

    #[test]
    fn test_push_routes_by_kind() {
        let registry = ChannelRegistry::new(&ChannelKind::ALL);
        let mut imu_sub = registry.imu().attach(QueueSize::DEFAULT).unwrap();
        let mut cam_sub = registry.camera().attach(QueueSize::DEFAULT).unwrap();

        assert_eq!(registry.push(imu(1)), PushOutcome::Stored);
        let frame = ImageFrame {
            timestamp_us: 2,
            width: 1,
            height: 1,
            format: PixelFormat::Gray8,
            data: Bytes::from_static(&[7]),
        };
        assert_eq!(registry.push(frame.into()), PushOutcome::Stored);
        assert_eq!(
            registry.push(
                AnalogSample {
                    timestamp_us: 3,
                    voltage: 0.5
                }
                .into()
            ),
            PushOutcome::Stored
        );
        // no scan session attached
        assert_eq!(
            registry.push(RangeScan::default().into()),
            PushOutcome::Discarded
        );

        assert_eq!(imu_sub.pop().map(|s| s.timestamp_us), Some(1));
        assert_eq!(cam_sub.pop().map(|s| s.timestamp_us), Some(2));
        assert_eq!(
            registry.adc().read().unwrap().map(|s| s.timestamp_us),
            Some(3)
        );
    }

    #[test]
    fn test_status_reports_sessions() {
        let registry = ChannelRegistry::new(&[ChannelKind::Imu]);
        let sub = registry.imu().attach(QueueSize::new(4).unwrap()).unwrap();
        registry.push(imu(1));

        let status = registry.channel_status(ChannelKind::Imu);
        assert!(status.available);
        assert_eq!(status.mode, ChannelMode::Streaming);
        assert_eq!(status.active_session, Some(sub.session_id()));
        assert_eq!(status.queue_depth, 1);
        assert_eq!(status.metrics.stored, 1);

        drop(sub);
        let status = registry.channel_status(ChannelKind::Imu);
        assert_eq!(status.active_session, None);
        assert_eq!(status.queue_depth, 0);
        assert_eq!(registry.status().len(), 4);
    }
}
