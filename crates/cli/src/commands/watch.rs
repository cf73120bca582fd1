//! `watch` command implementation.

use anyhow::Result;
use contracts::ChannelKind;
use std::time::Duration;
use streaming::transport::TcpClient;
use tracing::{info, warn};

use crate::cli::WatchArgs;
use crate::error::CliError;

/// Execute the `watch` command
pub async fn run_watch(args: &WatchArgs) -> Result<()> {
    let channel = ChannelKind::from(args.channel);
    let client = TcpClient::new(&args.addr, args.format.into());
    info!(addr = %args.addr, %channel, "Watching channel");

    let received = tokio::select! {
        result = watch(&client, channel, args) => result?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            return Ok(());
        }
    };

    info!(received, "Watch finished");
    Ok(())
}

async fn watch(client: &TcpClient, channel: ChannelKind, args: &WatchArgs) -> Result<u64> {
    let limit = (args.count > 0).then_some(args.count);

    if channel == ChannelKind::Adc {
        let interval = Duration::from_millis(args.interval_ms.max(1));
        let mut received = 0u64;
        while limit.is_none_or(|max| received < max) {
            match client.read_adc().await {
                Ok(reading) => {
                    received += 1;
                    println!("{}", contracts::WireMessage::from(reading));
                }
                // Retryable: the adapter has not produced yet
                Err(e) if e.code().is_retryable() => warn!(error = %e, "read failed, retrying"),
                Err(e) => return Err(CliError::remote(client.addr(), e).into()),
            }
            tokio::time::sleep(interval).await;
        }
        return Ok(received);
    }

    let mut stream = client
        .open_stream(channel, args.queue_size)
        .await
        .map_err(|e| CliError::remote(client.addr(), e))?;

    while limit.is_none_or(|max| stream.received() < max) {
        match stream.next().await {
            Ok(Some(message)) => println!("{message}"),
            Ok(None) => {
                info!("Server closed the stream");
                break;
            }
            Err(e) => return Err(CliError::remote(client.addr(), e).into()),
        }
    }
    Ok(stream.received())
}
