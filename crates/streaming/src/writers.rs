//! In-process stream writers
//!
//! - `ChannelWriter`: tokio mpsc backed, for in-process consumers and tests
//! - `LogWriter`: logs a one-line summary of every message via tracing

use std::marker::PhantomData;

use contracts::{ContractError, StreamWriter, WireMessage};
use tokio::sync::mpsc;
use tracing::{info, instrument};

/// Writer that forwards messages into an mpsc channel
///
/// Dropping the receiver is how an in-process consumer disconnects.
pub struct ChannelWriter<M> {
    peer: String,
    tx: mpsc::Sender<M>,
}

impl<M: Send + 'static> ChannelWriter<M> {
    pub fn new(peer: impl Into<String>, tx: mpsc::Sender<M>) -> Self {
        Self {
            peer: peer.into(),
            tx,
        }
    }

    /// Writer + receiver with a buffer of `capacity` messages
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<M>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new("in-process", tx), rx)
    }
}

impl<M: Send + 'static> StreamWriter for ChannelWriter<M> {
    type Item = M;

    fn peer(&self) -> &str {
        &self.peer
    }

    async fn write(&mut self, item: M) -> Result<(), ContractError> {
        self.tx
            .send(item)
            .await
            .map_err(|_| ContractError::transport_write(&self.peer, "receiver dropped"))
    }
}

/// Writer that logs message summaries for debugging
pub struct LogWriter<M> {
    name: String,
    written: u64,
    _message: PhantomData<fn(M)>,
}

impl<M> LogWriter<M> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            written: 0,
            _message: PhantomData,
        }
    }

    /// Messages logged so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl<M: Into<WireMessage> + Send + 'static> StreamWriter for LogWriter<M> {
    type Item = M;

    fn peer(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_writer_write", skip_all, fields(writer = %self.name))]
    async fn write(&mut self, item: M) -> Result<(), ContractError> {
        let message: WireMessage = item.into();
        self.written += 1;
        info!(seq = self.written, summary = %message, "message received");
        Ok(())
    }
}
