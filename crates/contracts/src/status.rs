//! Call outcome as seen by the peer

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status code of a finished or rejected call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Ok,
    /// Malformed request parameter; never retried automatically
    InvalidArgument,
    /// No adapter registered for the channel; permanent
    Unavailable,
    /// A session is already active on the channel; transient
    ResourceExhausted,
    /// The channel could not produce a value
    Unknown,
    Internal,
}

impl StatusCode {
    /// Whether the caller may retry the same request later
    pub fn is_retryable(self) -> bool {
        matches!(self, StatusCode::ResourceExhausted | StatusCode::Unknown)
    }
}

/// Status code + human readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::Ok, "")
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{:?}", self.code)
        } else {
            write!(f, "{:?}: {}", self.code, self.message)
        }
    }
}
