//! Stream / unary request parameters

use serde::{Deserialize, Serialize};

/// Parameters of a streaming call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    /// Queue capacity for the session; absent ⇒ server default
    #[serde(default)]
    pub queue_size: Option<u32>,
}

impl StreamRequest {
    pub fn with_queue_size(queue_size: u32) -> Self {
        Self {
            queue_size: Some(queue_size),
        }
    }
}

/// Parameters of the unary ADC read (none)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcRequest {}
