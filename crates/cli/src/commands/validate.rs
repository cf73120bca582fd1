//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ChannelKind, ServerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    listen_addr: String,
    adapter_count: usize,
    channels: Vec<ChannelKind>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    listen_addr: blueprint.server.listen_addr.clone(),
                    adapter_count: blueprint.adapters.len(),
                    channels: blueprint.available_channels(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &ServerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.adapters.is_empty() {
        warnings.push("No adapters configured - every call will be Unavailable".to_string());
    }

    for kind in ChannelKind::ALL {
        if blueprint.adapter(kind).is_none() {
            warnings.push(format!("Channel '{}' has no adapter and will be unavailable", kind));
        }
    }

    // A session queue smaller than one second of samples overflows under any consumer hiccup
    for adapter in &blueprint.adapters {
        let per_second = adapter.frequency_hz.ceil() as u64;
        if adapter.kind.mode() == contracts::ChannelMode::Streaming
            && u64::from(blueprint.server.default_queue_size) < per_second
        {
            warnings.push(format!(
                "default_queue_size {} holds less than one second of '{}' samples ({} Hz)",
                blueprint.server.default_queue_size, adapter.kind, adapter.frequency_hz
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Listen: {}", summary.listen_addr);
            println!("  Adapters: {}", summary.adapter_count);
            println!("  Channels: {:?}", summary.channels);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(contents: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        (file, args)
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let (_file, args) = args_for(
            r#"
[server]
listen_addr = "127.0.0.1:50051"
default_queue_size = 10

[[adapters]]
kind = "imu"
frequency_hz = 200.0
"#,
        );
        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("'scan' has no adapter")));
        assert!(warnings.iter().any(|w| w.contains("less than one second")));
        assert_eq!(result.summary.unwrap().channels, vec![ChannelKind::Imu]);
    }

    #[test]
    fn test_invalid_config() {
        let (_file, args) = args_for(
            r#"
[[adapters]]
kind = "imu"
frequency_hz = 0.0
"#,
        );
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("frequency_hz"));
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/broker.toml".into(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
        assert!(run_validate(&args).is_err());
    }
}
