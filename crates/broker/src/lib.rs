//! # Broker
//!
//! Per-channel sample brokering between hardware producers and stream
//! consumers.
//!
//! Responsibilities:
//! - Bounded drop-oldest sample queue per streaming session
//! - At most one active consumer per channel (session guard)
//! - Latest-value slot for unary channels
//! - Channel registry: one broker per channel kind, availability fixed at construction
//!
//! ## Backpressure
//!
//! Producers never block and never fail: a push into a full queue evicts the
//! oldest sample. Freshness wins over completeness.
//!
//! ## Usage
//!
//! ```ignore
//! use broker::{ChannelRegistry, QueueSize};
//! use contracts::ChannelKind;
//!
//! let registry = ChannelRegistry::new(&[ChannelKind::Imu, ChannelKind::Adc]);
//!
//! // consumer side
//! let mut sub = registry.imu().attach(QueueSize::default())?;
//!
//! // producer side (any thread)
//! registry.push(sample.into());
//!
//! while let Some(sample) = sub.pop() { /* ... */ }
//! // dropping `sub` frees the channel for the next session
//! ```

mod broker;
mod error;
mod metrics;
mod queue;
mod registry;
mod session;
mod unary;

pub use broker::{SensorBroker, Subscription};
pub use error::BrokerError;
pub use metrics::{BrokerMetrics, BrokerMetricsSnapshot};
pub use queue::{BoundedSampleQueue, PushOutcome, QueueSize};
pub use registry::{ChannelRegistry, ChannelStatus};
pub use session::{SessionGuard, SessionId};
pub use unary::UnarySlot;
