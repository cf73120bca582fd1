//! Ingestion Pipeline main entry

use std::sync::Arc;

use broker::ChannelRegistry;
use contracts::{ChannelKind, SampleSource, ServerBlueprint};
use tracing::{debug, info, instrument};

use crate::config::{IngestionMetrics, ProducerConfig};
use crate::error::{IngestionError, Result};
use crate::factory::create_source;
use crate::producer::SourceProducer;

/// Ingestion Pipeline
///
/// Owns one producer thread per registered source and pushes everything
/// into the shared channel registry.
pub struct IngestionPipeline {
    /// Destination of all samples
    registry: Arc<ChannelRegistry>,

    /// Registered producers, in registration order
    producers: Vec<SourceProducer>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Default producer configuration
    default_config: ProducerConfig,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self::with_config(registry, ProducerConfig::default())
    }

    /// Create with custom producer configuration
    pub fn with_config(registry: Arc<ChannelRegistry>, config: ProducerConfig) -> Self {
        Self {
            registry,
            producers: Vec::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            default_config: config,
        }
    }

    /// Create a pipeline with one source per configured adapter
    pub fn from_blueprint(
        registry: Arc<ChannelRegistry>,
        blueprint: &ServerBlueprint,
    ) -> Result<Self> {
        let mut pipeline = Self::new(registry);
        for adapter in &blueprint.adapters {
            pipeline.register_source(create_source(adapter)?, None)?;
        }
        Ok(pipeline)
    }

    /// Register a sample source
    ///
    /// At most one source per name and per channel kind.
    #[instrument(
        name = "ingestion_register_source",
        skip(self, source, config),
        fields(source = %source.name(), kind = %source.kind())
    )]
    pub fn register_source(
        &mut self,
        source: Box<dyn SampleSource>,
        config: Option<ProducerConfig>,
    ) -> Result<()> {
        if self.producers.iter().any(|p| p.name() == source.name()) {
            return Err(IngestionError::DuplicateSource {
                name: source.name().to_string(),
            });
        }
        if let Some(existing) = self.producers.iter().find(|p| p.kind() == source.kind()) {
            return Err(IngestionError::ChannelTaken {
                channel: source.kind().to_string(),
                existing: existing.name().to_string(),
            });
        }

        let producer =
            SourceProducer::new(source, config.unwrap_or_else(|| self.default_config.clone()));
        debug!("registered source");
        self.producers.push(producer);
        Ok(())
    }

    /// Start all registered producers
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&mut self) -> Result<()> {
        info!(count = self.producers.len(), "starting all producers");
        for producer in &mut self.producers {
            if !producer.is_running() {
                debug!(source = %producer.name(), "starting producer");
                producer.start(self.registry.clone(), self.metrics.clone())?;
            }
        }
        Ok(())
    }

    /// Stop all producers and join their threads
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&mut self) {
        info!(count = self.producers.len(), "stopping all producers");
        for producer in &mut self.producers {
            if producer.is_running() {
                debug!(source = %producer.name(), "stopping producer");
                producer.stop();
            }
        }
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered source count
    pub fn source_count(&self) -> usize {
        self.producers.len()
    }

    /// Channel kinds with a registered source
    pub fn kinds(&self) -> Vec<ChannelKind> {
        self.producers.iter().map(|p| p.kind()).collect()
    }

    /// Check if specified source is running
    pub fn is_running(&self, name: &str) -> bool {
        self.producers
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.is_running())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}
