//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, ServerBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<ServerBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<ServerBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<ServerBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ChannelKind, DriverKind};

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[server]
listen_addr = "0.0.0.0:6000"
wire_format = "bincode"
poll_interval_us = 500
default_queue_size = 10
jpeg_quality = 70

[[adapters]]
kind = "scan"
driver = "sim"
frequency_hz = 10.0
[adapters.params]
points = "720"

[[adapters]]
kind = "camera"
frequency_hz = 30.0
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.server.poll_interval_us, 500);
        assert_eq!(bp.server.jpeg_quality, 70);
        assert_eq!(bp.adapters.len(), 2);
        assert_eq!(bp.adapters[0].driver, DriverKind::Sim);
        assert_eq!(bp.adapters[0].params.get("points").map(String::as_str), Some("720"));
        assert_eq!(bp.adapters[1].kind, ChannelKind::Camera);
    }

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let bp = parse_toml("").unwrap();
        assert_eq!(bp.server.listen_addr, "0.0.0.0:50051");
        assert!(bp.adapters.is_empty());
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "server": { "listen_addr": "127.0.0.1:7000" },
            "adapters": [{ "kind": "adc", "frequency_hz": 5.0 }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().adapters[0].kind, ChannelKind::Adc);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_channel_kind() {
        let content = r#"
[[adapters]]
kind = "radar"
frequency_hz = 1.0
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
