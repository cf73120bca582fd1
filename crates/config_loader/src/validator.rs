//! 配置校验模块
//!
//! 校验规则：
//! - 每种通道至多一个 adapter
//! - frequency_hz 在 [0.001, 100000] Hz 内
//! - 1 <= default_queue_size <= 100000
//! - 0 < poll_interval_us <= 100000
//! - 1 <= jpeg_quality <= 100
//! - listen_addr 为合法 socket 地址

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{AdapterConfig, ContractError, ServerBlueprint};

/// 队列长度上限 (与 broker 的 QueueSize::MAX 一致)
const MAX_QUEUE_SIZE: u32 = 100_000;

/// 等待粒度上限 (µs)，限制取消延迟
const MAX_POLL_INTERVAL_US: u64 = 100_000;

/// 校验 ServerBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &ServerBlueprint) -> Result<(), ContractError> {
    validate_server(blueprint)?;
    validate_adapter_kinds(blueprint)?;
    validate_adapter_frequencies(blueprint)?;
    Ok(())
}

/// 校验 server 段
fn validate_server(blueprint: &ServerBlueprint) -> Result<(), ContractError> {
    let server = &blueprint.server;

    if server.listen_addr.parse::<SocketAddr>().is_err() {
        return Err(ContractError::config_validation(
            "server.listen_addr",
            format!("'{}' is not a valid socket address", server.listen_addr),
        ));
    }

    if !(1..=MAX_QUEUE_SIZE).contains(&server.default_queue_size) {
        return Err(ContractError::config_validation(
            "server.default_queue_size",
            format!(
                "default_queue_size must be in [1, {MAX_QUEUE_SIZE}], got {}",
                server.default_queue_size
            ),
        ));
    }

    if server.poll_interval_us == 0 || server.poll_interval_us > MAX_POLL_INTERVAL_US {
        return Err(ContractError::config_validation(
            "server.poll_interval_us",
            format!(
                "poll_interval_us must be in [1, {MAX_POLL_INTERVAL_US}], got {}",
                server.poll_interval_us
            ),
        ));
    }

    if !(1..=100).contains(&server.jpeg_quality) {
        return Err(ContractError::config_validation(
            "server.jpeg_quality",
            format!(
                "jpeg_quality must be in [1, 100], got {}",
                server.jpeg_quality
            ),
        ));
    }

    Ok(())
}

/// 校验 adapter 通道唯一性
fn validate_adapter_kinds(blueprint: &ServerBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for adapter in &blueprint.adapters {
        if !seen.insert(adapter.kind) {
            return Err(ContractError::config_validation(
                format!("adapters[kind={}]", adapter.kind),
                "duplicate adapter for channel",
            ));
        }
    }
    Ok(())
}

/// 校验 adapter 采样率
fn validate_adapter_frequencies(blueprint: &ServerBlueprint) -> Result<(), ContractError> {
    for adapter in &blueprint.adapters {
        let range = AdapterConfig::MIN_FREQUENCY_HZ..=AdapterConfig::MAX_FREQUENCY_HZ;
        if !range.contains(&adapter.frequency_hz) {
            return Err(ContractError::config_validation(
                format!("adapters[{}].frequency_hz", adapter.kind),
                format!(
                    "frequency_hz must be in [{}, {}], got {}",
                    range.start(),
                    range.end(),
                    adapter.frequency_hz
                ),
            ));
        }
    }
    Ok(())
}
