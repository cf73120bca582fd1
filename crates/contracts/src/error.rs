//! Layered error definitions
//!
//! Categorized by source: config / transport / codec

use thiserror::Error;

use crate::ChannelKind;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Writing an item to the consumer failed (peer gone)
    #[error("transport write error on '{peer}': {message}")]
    TransportWrite { peer: String, message: String },

    /// Transport connection error
    #[error("transport connection error on '{peer}': {message}")]
    TransportConnection { peer: String, message: String },

    // ===== Codec Errors =====
    /// Sample could not be converted to its wire message
    #[error("encode error on {channel} channel: {message}")]
    Encode { channel: ChannelKind, message: String },

    /// Wire message could not be decoded
    #[error("decode error: {message}")]
    Decode { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport write error
    pub fn transport_write(peer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportWrite {
            peer: peer.into(),
            message: message.into(),
        }
    }

    /// Create transport connection error
    pub fn transport_connection(peer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportConnection {
            peer: peer.into(),
            message: message.into(),
        }
    }

    /// Create encode error
    pub fn encode(channel: ChannelKind, message: impl Into<String>) -> Self {
        Self::Encode {
            channel,
            message: message.into(),
        }
    }

    /// Create decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}
