//! # Streaming
//!
//! Consumer side of the broker: one parametric stream pump shared by every
//! streaming channel, the wire codec, and a thin TCP binding.
//!
//! ## Flow
//!
//! ```text
//! request ─▶ validate ─▶ attach ─▶ loop { pop ─▶ encode ─▶ write | wait } ─▶ detach
//!                │           │
//!                ▼           ▼
//!        InvalidArgument   Unavailable / ResourceExhausted
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use streaming::{ChannelWriter, SensorService, ServiceConfig, StreamRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! let service = SensorService::new(registry, ServiceConfig::default());
//! let (mut writer, mut rx) = ChannelWriter::pair(16);
//! let cancel = CancellationToken::new();
//!
//! tokio::spawn(async move {
//!     let summary = service.stream_imu(&StreamRequest::default(), &mut writer, &cancel).await?;
//! });
//! while let Some(msg) = rx.recv().await { /* ... */ }
//! ```

mod codec;
mod error;
mod metrics;
mod pump;
mod request;
mod service;
pub mod transport;
mod writers;

pub use codec::{
    decode_adc, decode_camera, decode_imu, decode_scan, AdcCodec, CameraCodec, ImuCodec,
    ScanCodec, WireCodec,
};
pub use error::StreamError;
pub use metrics::{PumpMetrics, PumpMetricsSnapshot};
pub use pump::{ActiveStream, PumpConfig, SessionEnd, StreamPump, StreamSummary};
pub use request::{AdcRequest, StreamRequest};
pub use service::{SensorService, ServiceConfig};
pub use writers::{ChannelWriter, LogWriter};
