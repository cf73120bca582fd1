//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::{ChannelKind, WireFormat};
use std::path::PathBuf;

/// Sensor Broker - bounded, drop-oldest sensor streaming over TCP
#[derive(Parser, Debug)]
#[command(
    name = "sensor-broker",
    author,
    version,
    about = "Sensor streaming broker",
    long_about = "Brokers samples from hardware adapters to remote consumers.\n\n\
                  Each channel (scan, imu, camera) serves one streaming client at a time \n\
                  through a bounded drop-oldest queue; the ADC channel answers unary reads."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SENSOR_BROKER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SENSOR_BROKER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the broker: producers + TCP transport
    Serve(ServeArgs),

    /// Subscribe to a channel of a running broker and print messages
    Watch(WatchArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "SENSOR_BROKER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override listen address from configuration
    #[arg(long, env = "SENSOR_BROKER_LISTEN")]
    pub listen: Option<String>,

    /// Override the default wire format for clients that don't pick one
    #[arg(long, value_enum)]
    pub wire_format: Option<FormatArg>,

    /// Override the default per-session queue size
    #[arg(long)]
    pub queue_size: Option<u32>,

    /// Stop after this many seconds (0 = run until Ctrl-C)
    #[arg(long, default_value = "0", env = "SENSOR_BROKER_DURATION")]
    pub duration: u64,

    /// Validate configuration and exit without serving
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "SENSOR_BROKER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `watch` command
#[derive(Parser, Debug, Clone)]
pub struct WatchArgs {
    /// Broker address
    #[arg(short, long, default_value = "127.0.0.1:50051", env = "SENSOR_BROKER_ADDR")]
    pub addr: String,

    /// Channel to watch
    #[arg(long, value_enum)]
    pub channel: ChannelArg,

    /// Requested queue size (server default when absent)
    #[arg(long)]
    pub queue_size: Option<u32>,

    /// Stop after this many messages (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub count: u64,

    /// Frame encoding
    #[arg(long, value_enum, default_value = "bincode")]
    pub format: FormatArg,

    /// Poll interval for unary channels, in milliseconds
    #[arg(long, default_value = "100")]
    pub interval_ms: u64,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show adapter parameters
    #[arg(long)]
    pub params: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

/// Channel selector
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelArg {
    Scan,
    Imu,
    Adc,
    Camera,
}

impl From<ChannelArg> for ChannelKind {
    fn from(channel: ChannelArg) -> Self {
        match channel {
            ChannelArg::Scan => ChannelKind::Scan,
            ChannelArg::Imu => ChannelKind::Imu,
            ChannelArg::Adc => ChannelKind::Adc,
            ChannelArg::Camera => ChannelKind::Camera,
        }
    }
}

/// Frame encoding selector
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    #[default]
    Bincode,
    Json,
}

impl From<FormatArg> for WireFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Bincode => WireFormat::Bincode,
            FormatArg::Json => WireFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch() {
        let cli = Cli::parse_from([
            "sensor-broker",
            "watch",
            "--channel",
            "imu",
            "--queue-size",
            "10",
            "--count",
            "5",
        ]);
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(ChannelKind::from(args.channel), ChannelKind::Imu);
                assert_eq!(args.queue_size, Some(10));
                assert_eq!(args.count, 5);
                assert_eq!(args.addr, "127.0.0.1:50051");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from([
            "sensor-broker",
            "-v",
            "serve",
            "--config",
            "broker.toml",
            "--listen",
            "127.0.0.1:6000",
            "--duration",
            "3",
            "--wire-format",
            "json",
            "--queue-size",
            "500",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, PathBuf::from("broker.toml"));
                assert_eq!(args.listen.as_deref(), Some("127.0.0.1:6000"));
                assert_eq!(args.duration, 3);
                assert_eq!(args.wire_format.map(WireFormat::from), Some(WireFormat::Json));
                assert_eq!(args.queue_size, Some(500));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
