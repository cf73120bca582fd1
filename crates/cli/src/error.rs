//! Error types for CLI operations.

use streaming::StreamError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Call to a running broker failed
    #[error("Call to {addr} failed: {source}")]
    Remote {
        addr: String,
        #[source]
        source: StreamError,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn remote(addr: impl Into<String>, source: StreamError) -> Self {
        Self::Remote {
            addr: addr.into(),
            source,
        }
    }
}
