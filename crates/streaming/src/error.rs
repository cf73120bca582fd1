//! Stream 错误类型
//!
//! 每个错误映射到对端可见的 `StatusCode`。

use broker::BrokerError;
use contracts::{ChannelKind, ContractError, Status, StatusCode};
use thiserror::Error;

/// Outcome of a rejected or failed call
#[derive(Debug, Error)]
pub enum StreamError {
    /// 请求参数非法 (队列长度越界)，不会自动重试
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// 通道没有 adapter
    #[error("{channel} not available")]
    Unavailable { channel: ChannelKind },

    /// 通道已有活动 session
    #[error("Only one client per stream supported")]
    ResourceExhausted { channel: ChannelKind },

    /// Unary 通道的 adapter 尚未产生样本
    #[error("{channel} read failure: no sample produced yet")]
    NoData { channel: ChannelKind },

    /// 传输层错误 (连接、帧编解码)
    #[error("transport error: {0}")]
    Transport(#[from] ContractError),

    /// 对端返回的非 OK 状态 (客户端侧)
    #[error("remote error: {0}")]
    Remote(Status),

    /// 服务内部错误
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl StreamError {
    /// Status code seen by the peer
    pub fn code(&self) -> StatusCode {
        match self {
            StreamError::InvalidArgument { .. } => StatusCode::InvalidArgument,
            StreamError::Unavailable { .. } => StatusCode::Unavailable,
            StreamError::ResourceExhausted { .. } => StatusCode::ResourceExhausted,
            StreamError::NoData { .. } => StatusCode::Unknown,
            StreamError::Remote(status) => status.code,
            StreamError::Transport(_) | StreamError::Internal { .. } => StatusCode::Internal,
        }
    }

    /// Convert into the status sent to the peer
    pub fn into_status(self) -> Status {
        match self {
            StreamError::Remote(status) => status,
            other => Status::new(other.code(), other.to_string()),
        }
    }

    /// Metric label of the rejection reason
    pub fn reason(&self) -> &'static str {
        match self {
            StreamError::InvalidArgument { .. } => "invalid_argument",
            StreamError::Unavailable { .. } => "unavailable",
            StreamError::ResourceExhausted { .. } => "resource_exhausted",
            StreamError::NoData { .. } => "no_data",
            StreamError::Transport(_) => "transport",
            StreamError::Remote(_) => "remote",
            StreamError::Internal { .. } => "internal",
        }
    }

    /// Rebuild an error from a non-OK status received from a server
    pub fn from_status(status: Status) -> Self {
        StreamError::Remote(status)
    }
}

impl From<BrokerError> for StreamError {
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::Unavailable { channel } => StreamError::Unavailable { channel },
            BrokerError::AlreadyStreaming { channel, .. } => {
                StreamError::ResourceExhausted { channel }
            }
            BrokerError::InvalidQueueSize { .. } => StreamError::InvalidArgument {
                message: e.to_string(),
            },
            BrokerError::NotStreamable { .. } | BrokerError::NotUnary { .. } => {
                StreamError::Internal {
                    message: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker::{QueueSize, SensorBroker};
    use contracts::InertialSample;
    use std::sync::Arc;

    #[test]
    fn test_broker_error_mapping() {
        let invalid: StreamError = BrokerError::InvalidQueueSize { requested: 0 }.into();
        assert_eq!(invalid.code(), StatusCode::InvalidArgument);

        let unavailable: StreamError = BrokerError::Unavailable {
            channel: ChannelKind::Scan,
        }
        .into();
        assert_eq!(unavailable.code(), StatusCode::Unavailable);
        assert_eq!(unavailable.to_string(), "scan not available");
    }

    #[test]
    fn test_already_streaming_maps_to_resource_exhausted() {
        let broker: Arc<SensorBroker<InertialSample>> = Arc::new(SensorBroker::new(true));
        let _sub = broker.attach(QueueSize::DEFAULT).unwrap();
        let err: StreamError = broker.attach(QueueSize::DEFAULT).unwrap_err().into();

        let status = err.into_status();
        assert_eq!(status.code, StatusCode::ResourceExhausted);
        assert_eq!(status.message, "Only one client per stream supported");
    }

    #[test]
    fn test_no_data_is_unknown() {
        let err = StreamError::NoData {
            channel: ChannelKind::Adc,
        };
        assert_eq!(err.code(), StatusCode::Unknown);
        assert!(err.code().is_retryable());
    }

    #[test]
    fn test_remote_status_round_trip() {
        let status = Status::new(StatusCode::Unavailable, "camera not available");
        let err = StreamError::from_status(status.clone());
        assert_eq!(err.code(), StatusCode::Unavailable);
        assert_eq!(err.into_status(), status);
    }
}
