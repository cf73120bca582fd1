//! Server orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{Server, ServerOptions};
pub use stats::ServerStats;
