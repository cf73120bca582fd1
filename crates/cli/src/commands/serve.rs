//! `serve` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, ConfigOverrides};
use std::time::Duration;
use tracing::info;

use crate::cli::ServeArgs;
use crate::error::CliError;
use crate::server::{Server, ServerOptions};

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let overrides = ConfigOverrides {
        listen_addr: args.listen.clone(),
        wire_format: args.wire_format.map(Into::into),
        default_queue_size: args.queue_size,
    };
    if !overrides.is_empty() {
        info!(?overrides, "Applying CLI overrides");
    }
    let blueprint = ConfigLoader::apply_overrides(blueprint, &overrides)
        .context("Invalid command-line override")?;

    info!(
        listen = %blueprint.server.listen_addr,
        format = ?blueprint.server.wire_format,
        adapters = blueprint.adapters.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let options = ServerOptions {
        blueprint,
        duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting broker...");
    let stats = Server::new(options)
        .run(setup_shutdown_signal())
        .await
        .context("Broker failed")?;

    stats.print_summary();
    info!("Sensor broker finished");
    Ok(())
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::ServerBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Server:");
    println!("  Listen: {}", blueprint.server.listen_addr);
    println!("  Wire format: {:?}", blueprint.server.wire_format);
    println!("  Default queue size: {}", blueprint.server.default_queue_size);
    println!("\nAdapters ({}):", blueprint.adapters.len());
    for adapter in &blueprint.adapters {
        println!(
            "  - {} ({} mode, {} Hz)",
            adapter.name(),
            match adapter.kind.mode() {
                contracts::ChannelMode::Streaming => "streaming",
                contracts::ChannelMode::Unary => "unary",
            },
            adapter.frequency_hz
        );
    }
    println!();
}
