//! # Config Loader
//!
//! 读取 broker 配置文件 (TOML / JSON)，校验后产出 `ServerBlueprint`。
//!
//! ```no_run
//! use config_loader::{ConfigLoader, ConfigOverrides};
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("config.toml")).unwrap();
//! let blueprint = ConfigLoader::apply_overrides(
//!     blueprint,
//!     &ConfigOverrides {
//!         listen_addr: Some("127.0.0.1:6000".into()),
//!         ..Default::default()
//!     },
//! )
//! .unwrap();
//! println!("listening on {}", blueprint.server.listen_addr);
//! ```

mod parser;
mod validator;

pub use contracts::ServerBlueprint;
pub use parser::ConfigFormat;

use std::path::Path;

use contracts::{ContractError, WireFormat};

/// Command-line / environment overrides of the `[server]` section
///
/// `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen_addr: Option<String>,
    pub wire_format: Option<WireFormat>,
    pub default_queue_size: Option<u32>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.listen_addr.is_none() && self.wire_format.is_none() && self.default_queue_size.is_none()
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load, parse and validate a config file
    ///
    /// Format comes from the extension (`.toml` / `.json`).
    ///
    /// # Errors
    /// Unreadable file, unknown extension, parse or validation failure
    pub fn load_from_path(path: &Path) -> Result<ServerBlueprint, ContractError> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// # Errors
    /// Parse or validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<ServerBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn validate(blueprint: &ServerBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Apply overrides, then re-validate the result
    ///
    /// # Errors
    /// An override produced an invalid blueprint (bad address, queue size out of range)
    pub fn apply_overrides(
        mut blueprint: ServerBlueprint,
        overrides: &ConfigOverrides,
    ) -> Result<ServerBlueprint, ContractError> {
        if overrides.is_empty() {
            return Ok(blueprint);
        }
        let server = &mut blueprint.server;
        if let Some(addr) = &overrides.listen_addr {
            server.listen_addr = addr.clone();
        }
        if let Some(format) = overrides.wire_format {
            server.wire_format = format;
        }
        if let Some(size) = overrides.default_queue_size {
            server.default_queue_size = size;
        }
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &ServerBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &ServerBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ContractError::config_parse("config file has no extension"))?;
    ConfigFormat::from_extension(ext)
        .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
}
