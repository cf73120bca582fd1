//! Server orchestrator - wires registry, producers, service and transport.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use broker::ChannelRegistry;
use contracts::ServerBlueprint;
use ingestion::IngestionPipeline;
use streaming::transport::TcpTransport;
use streaming::{SensorService, ServiceConfig};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::ServerStats;

/// How long open connections get to wind down after shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Validated blueprint (CLI overrides already applied)
    pub blueprint: ServerBlueprint,

    /// Stop after this long (None = until shutdown signal)
    pub duration: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main server orchestrator
pub struct Server {
    options: ServerOptions,
}

impl Server {
    pub fn new(options: ServerOptions) -> Self {
        Self { options }
    }

    /// Run until `shutdown` resolves or the configured duration elapses
    ///
    /// Startup order: registry ⇒ producers ⇒ service ⇒ listener. Producers
    /// are stopped only after the transport has drained.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<ServerStats> {
        let start_time = Instant::now();
        let blueprint = &self.options.blueprint;

        if let Some(port) = self.options.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let channels = blueprint.available_channels();
        let registry = Arc::new(ChannelRegistry::new(&channels));

        info!("Setting up producers...");
        let mut ingestion = IngestionPipeline::from_blueprint(registry.clone(), blueprint)
            .context("Failed to create sample sources")?;

        let service_config = ServiceConfig::from_server_config(&blueprint.server)
            .context("Invalid server settings")?;
        let service = Arc::new(SensorService::new(registry.clone(), service_config));
        let transport = TcpTransport::new(service.clone(), blueprint.server.wire_format);

        let listener = TcpListener::bind(&blueprint.server.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", blueprint.server.listen_addr))?;

        ingestion
            .start_all()
            .context("Failed to start producers")?;
        info!(
            sources = ingestion.source_count(),
            channels = ?channels,
            "Producers running"
        );

        let stop = CancellationToken::new();
        let serve_task = {
            let stop = stop.clone();
            tokio::spawn(async move { transport.serve(listener, stop).await })
        };

        let deadline = async {
            match self.options.duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = shutdown => warn!("Received shutdown signal, stopping broker..."),
            _ = deadline => info!("Run duration elapsed, stopping broker..."),
        }

        stop.cancel();
        match tokio::time::timeout(DRAIN_TIMEOUT, serve_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => warn!(error = %e, "Transport stopped with error"),
            Ok(Err(e)) => warn!(error = %e, "Transport task panicked"),
            Err(_) => warn!("Timed out waiting for connections to close"),
        }

        ingestion.stop_all();

        let stats = ServerStats {
            duration: start_time.elapsed(),
            ingestion: ingestion.metrics().snapshot(),
            sessions: service.session_stats(),
            channels: registry.status(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            samples = stats.ingestion.samples_received,
            sessions = stats.sessions.total_sessions,
            "Broker shutdown complete"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AdapterConfig, ChannelKind, DriverKind, ServerConfig};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_runs_for_duration_and_reports() {
        let blueprint = ServerBlueprint {
            version: Default::default(),
            server: ServerConfig {
                listen_addr: "127.0.0.1:0".to_string(),
                ..ServerConfig::default()
            },
            adapters: vec![AdapterConfig {
                kind: ChannelKind::Imu,
                driver: DriverKind::Sim,
                frequency_hz: 200.0,
                params: HashMap::new(),
            }],
        };
        let server = Server::new(ServerOptions {
            blueprint,
            duration: Some(Duration::from_millis(200)),
            metrics_port: None,
        });

        let stats = server.run(std::future::pending()).await.unwrap();
        assert!(stats.duration >= Duration::from_millis(200));
        assert!(stats.ingestion.samples_received > 0);
        // nobody subscribed: every sample discarded
        assert_eq!(
            stats.ingestion.samples_discarded,
            stats.ingestion.samples_received
        );
        assert_eq!(stats.channels.len(), 4);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let blueprint = ServerBlueprint {
            version: Default::default(),
            server: ServerConfig {
                listen_addr: "256.0.0.1:1".to_string(),
                ..ServerConfig::default()
            },
            adapters: Vec::new(),
        };
        let server = Server::new(ServerOptions {
            blueprint,
            duration: Some(Duration::from_millis(10)),
            metrics_port: None,
        });
        assert!(server.run(std::future::pending()).await.is_err());
    }
}
