//! # Ingestion Pipeline
//!
//! Producer side of the broker.
//!
//! Responsibilities:
//! - Register sample sources (simulated or real adapters)
//! - Drive each source on its own OS thread
//! - Push every sample into the `ChannelRegistry` (never blocks, drop-oldest)
//! - Count received / stored / evicted / discarded samples
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::IngestionPipeline;
//!
//! let registry = Arc::new(ChannelRegistry::new(&blueprint.available_channels()));
//! let mut pipeline = IngestionPipeline::from_blueprint(registry.clone(), &blueprint)?;
//! pipeline.start_all()?;
//! // ... serve consumers from `registry` ...
//! pipeline.stop_all();
//! ```
//!
//! ## Simulated Sources
//!
//! ```ignore
//! use ingestion::SimImu;
//!
//! let source = SimImu::new("sim_imu", 200.0);
//! pipeline.register_source(Box::new(source), None)?;
//! ```

mod config;
mod error;
mod factory;
mod pipeline;
mod producer;
mod sim;

// Re-exports
pub use config::{IngestionMetrics, MetricsSnapshot, ProducerConfig};
pub use error::{IngestionError, Result};
pub use factory::create_source;
pub use pipeline::IngestionPipeline;
pub use producer::SourceProducer;
pub use sim::{RateLimiter, SimAdc, SimCamera, SimImu, SimLidar};
