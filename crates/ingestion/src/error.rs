//! Ingestion 错误类型

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 同名 source 已注册
    #[error("source {name} is already registered")]
    DuplicateSource {
        /// Source 名称
        name: String,
    },

    /// 同一通道已有 source
    #[error("channel {channel} already has source {existing}")]
    ChannelTaken {
        /// 通道
        channel: String,
        /// 已注册的 source
        existing: String,
    },

    /// 适配器参数非法
    #[error("invalid parameter '{key}' for {name}: {message}")]
    InvalidParam {
        /// Source 名称
        name: String,
        /// 参数名
        key: String,
        /// 错误消息
        message: String,
    },

    /// Producer 线程启动失败
    #[error("failed to spawn producer thread for {name}: {source}")]
    SpawnFailed {
        /// Source 名称
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
