//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{ChannelKind, ChannelMode, ServerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    server: ServerInfo,
    channels: Vec<ChannelInfo>,
}

#[derive(Serialize)]
struct ServerInfo {
    listen_addr: String,
    wire_format: String,
    poll_interval_us: u64,
    default_queue_size: u32,
    jpeg_quality: u8,
}

#[derive(Serialize)]
struct ChannelInfo {
    kind: ChannelKind,
    mode: ChannelMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    adapter: Option<AdapterInfo>,
}

#[derive(Serialize)]
struct AdapterInfo {
    name: String,
    frequency_hz: f64,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &ServerBlueprint, args: &InfoArgs) -> ConfigInfo {
    let channels = ChannelKind::ALL
        .into_iter()
        .map(|kind| ChannelInfo {
            kind,
            mode: kind.mode(),
            adapter: blueprint.adapter(kind).map(|a| AdapterInfo {
                name: a.name(),
                frequency_hz: a.frequency_hz,
                params: if args.params {
                    a.params.clone()
                } else {
                    HashMap::new()
                },
            }),
        })
        .collect();

    let server = &blueprint.server;
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        server: ServerInfo {
            listen_addr: server.listen_addr.clone(),
            wire_format: format!("{:?}", server.wire_format),
            poll_interval_us: server.poll_interval_us,
            default_queue_size: server.default_queue_size,
            jpeg_quality: server.jpeg_quality,
        },
        channels,
    }
}

fn print_config_info(blueprint: &ServerBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Sensor Broker Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let server = &blueprint.server;
    println!("🌐 Server");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Listen: {}", server.listen_addr);
    println!("   ├─ Wire format: {:?}", server.wire_format);
    println!("   ├─ Poll interval: {} µs", server.poll_interval_us);
    println!("   ├─ Default queue size: {}", server.default_queue_size);
    println!("   └─ JPEG quality: {}", server.jpeg_quality);

    println!("\n📡 Channels");
    for (i, kind) in ChannelKind::ALL.iter().enumerate() {
        let is_last = i == ChannelKind::ALL.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        match blueprint.adapter(*kind) {
            Some(adapter) => {
                println!(
                    "   {} {} ({:?}) ← {} @ {} Hz",
                    prefix,
                    kind,
                    kind.mode(),
                    adapter.name(),
                    adapter.frequency_hz
                );
                if args.params {
                    let mut params: Vec<_> = adapter.params.iter().collect();
                    params.sort();
                    for (key, value) in params {
                        println!("   {}     {} = {}", child_prefix, key, value);
                    }
                }
            }
            None => println!("   {} {} ({:?}) unavailable", prefix, kind, kind.mode()),
        }
    }

    println!();
}
