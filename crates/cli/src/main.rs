//! # Sensor Broker CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 服务编排与生命周期管理 (producer 线程 + TCP transport)
//! - 流订阅客户端 (`watch`)
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_serve, run_validate, run_watch};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Sensor broker CLI starting");

    let result = match &cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Watch(args) => run_watch(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    observability::init_tracing(cli.log_format.into(), level)
}
