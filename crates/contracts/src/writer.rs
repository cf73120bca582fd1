//! StreamWriter trait - transport output interface
//!
//! Defines the abstract interface a stream pump writes encoded items into.

use crate::ContractError;

/// Server-stream writer
///
/// One instance per streaming call. An `Err` from `write` means the peer is
/// gone; the caller stops writing and releases its session.
#[trait_variant::make(StreamWriter: Send)]
pub trait LocalStreamWriter {
    /// Wire message type accepted by this writer
    type Item;

    /// Peer description (used for logging)
    fn peer(&self) -> &str;

    /// Write one item to the peer
    ///
    /// # Errors
    /// Returns transport error when the peer disconnected or the write failed
    async fn write(&mut self, item: Self::Item) -> Result<(), ContractError>;
}
