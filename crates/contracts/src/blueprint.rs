//! ServerBlueprint - Config Loader 输出
//!
//! 描述完整的服务配置：监听地址、流参数、硬件适配器列表。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ChannelKind;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的服务配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 服务设置
    #[serde(default)]
    pub server: ServerConfig,

    /// 硬件适配器列表 (每个通道至多一个)
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
}

impl ServerBlueprint {
    /// Channel kinds that have an adapter configured
    pub fn available_channels(&self) -> Vec<ChannelKind> {
        let mut kinds: Vec<ChannelKind> = self.adapters.iter().map(|a| a.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Adapter configured for a channel, if any
    pub fn adapter(&self, kind: ChannelKind) -> Option<&AdapterConfig> {
        self.adapters.iter().find(|a| a.kind == kind)
    }
}

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// 传输层序列化格式
    #[serde(default)]
    pub wire_format: WireFormat,

    /// 空队列时 stream pump 的等待粒度 (µs)
    #[serde(default = "default_poll_interval_us")]
    pub poll_interval_us: u64,

    /// 请求未指定时的默认队列长度
    #[serde(default = "default_queue_size")]
    pub default_queue_size: u32,

    /// JPEG 编码质量 [1-100]
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            wire_format: WireFormat::default(),
            poll_interval_us: default_poll_interval_us(),
            default_queue_size: default_queue_size(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:50051".to_string()
}

fn default_poll_interval_us() -> u64 {
    1000
}

fn default_queue_size() -> u32 {
    100
}

fn default_jpeg_quality() -> u8 {
    85
}

/// 传输层序列化格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Bincode (binary, compact)
    #[default]
    Bincode,
    /// JSON (human-readable, larger)
    Json,
}

/// 硬件适配器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// 通道类型
    pub kind: ChannelKind,

    /// 驱动
    #[serde(default)]
    pub driver: DriverKind,

    /// 采样频率 (Hz)，必须 > 0
    pub frequency_hz: f64,

    /// 驱动特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl AdapterConfig {
    /// 最低采样频率 (Hz)
    pub const MIN_FREQUENCY_HZ: f64 = 0.001;
    /// 最高采样频率 (Hz)
    pub const MAX_FREQUENCY_HZ: f64 = 100_000.0;

    /// Adapter name used in logs: `<driver>_<kind>`
    pub fn name(&self) -> String {
        format!("{}_{}", self.driver.as_str(), self.kind)
    }

    /// Parse a driver parameter, falling back to `default` when absent or malformed
    pub fn param_or<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.params
            .get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}

/// 驱动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// 仿真数据
    #[default]
    Sim,
}

impl DriverKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DriverKind::Sim => "sim",
        }
    }
}
