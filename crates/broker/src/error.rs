//! Broker 错误类型

use contracts::ChannelKind;
use thiserror::Error;

use crate::session::SessionId;

/// Broker 错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// 通道没有注册 adapter (永久)
    #[error("{channel} not available")]
    Unavailable {
        /// 通道
        channel: ChannelKind,
    },

    /// 通道已有活动 session (暂时)
    #[error("only one client per stream supported: {channel} is held by session {active}")]
    AlreadyStreaming {
        /// 通道
        channel: ChannelKind,
        /// 当前持有通道的 session
        active: SessionId,
    },

    /// 请求的队列长度越界
    #[error("invalid queue size {requested}: must be in [1, 100000]")]
    InvalidQueueSize {
        /// 请求值
        requested: u32,
    },

    /// Unary 通道不支持 streaming
    #[error("{channel} is a unary channel and cannot be streamed")]
    NotStreamable {
        /// 通道
        channel: ChannelKind,
    },

    /// Streaming 通道没有 latest-value slot
    #[error("{channel} is a streaming channel and has no latest value")]
    NotUnary {
        /// 通道
        channel: ChannelKind,
    },
}

impl BrokerError {
    /// Whether the same request may succeed later
    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::AlreadyStreaming { .. })
    }
}
