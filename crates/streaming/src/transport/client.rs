//! TcpClient - the consumer side of the TCP binding

use contracts::{AdcMessage, ChannelKind, ContractError, Status, WireFormat, WireMessage};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use super::frame::{decode_payload, read_frame, CallRequest};
use crate::StreamError;

/// Client of [`super::TcpTransport`]
#[derive(Debug, Clone)]
pub struct TcpClient {
    addr: String,
    format: WireFormat,
}

impl TcpClient {
    pub fn new(addr: impl Into<String>, format: WireFormat) -> Self {
        Self {
            addr: addr.into(),
            format,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Open a streaming call
    ///
    /// Dropping the returned stream closes the connection, which cancels the
    /// session on the server.
    ///
    /// # Errors
    /// - `Remote(status)`: the server rejected the call
    /// - `Transport`: connection or framing failure
    pub async fn open_stream(
        &self,
        channel: ChannelKind,
        queue_size: Option<u32>,
    ) -> Result<RemoteStream, StreamError> {
        let conn = self.call(CallRequest::stream(channel, queue_size)).await?;
        Ok(RemoteStream {
            conn,
            format: self.format,
            channel,
            received: 0,
        })
    }

    /// Unary ADC read
    ///
    /// # Errors
    /// Same as [`TcpClient::open_stream`]
    pub async fn read_adc(&self) -> Result<AdcMessage, StreamError> {
        let conn = self.call(CallRequest::read(ChannelKind::Adc)).await?;
        let mut response = RemoteStream {
            conn,
            format: self.format,
            channel: ChannelKind::Adc,
            received: 0,
        };
        match response.next().await? {
            Some(WireMessage::Adc(message)) => Ok(message),
            Some(other) => Err(ContractError::decode(format!("expected adc reply, got {other}")).into()),
            None => Err(ContractError::transport_connection(&self.addr, "closed before reply").into()),
        }
    }

    async fn call(&self, request: CallRequest) -> Result<TcpStream, StreamError> {
        let mut conn = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| ContractError::transport_connection(&self.addr, e.to_string()))?;

        let request = request.with_format(self.format);
        let mut line = serde_json::to_vec(&request)
            .map_err(|e| ContractError::Other(format!("json error: {e}")))?;
        line.push(b'\n');
        conn.write_all(&line)
            .await
            .map_err(|e| ContractError::transport_write(&self.addr, e.to_string()))?;
        debug!(addr = %self.addr, ?request, "call sent");

        let payload = read_frame(&mut conn)
            .await
            .map_err(|e| ContractError::transport_connection(&self.addr, e.to_string()))?
            .ok_or_else(|| ContractError::transport_connection(&self.addr, "closed before status"))?;
        let status: Status = decode_payload(self.format, &payload)?;
        if !status.is_ok() {
            return Err(StreamError::from_status(status));
        }
        Ok(conn)
    }
}

/// Messages of an open streaming call
#[derive(Debug)]
pub struct RemoteStream {
    conn: TcpStream,
    format: WireFormat,
    channel: ChannelKind,
    received: u64,
}

impl RemoteStream {
    pub fn channel(&self) -> ChannelKind {
        self.channel
    }

    /// Messages received so far
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Next message; `None` when the server closed the call
    ///
    /// # Errors
    /// Framing or decode failure
    pub async fn next(&mut self) -> Result<Option<WireMessage>, StreamError> {
        let Some(payload) = read_frame(&mut self.conn)
            .await
            .map_err(|e| ContractError::transport_connection(self.channel.as_str(), e.to_string()))?
        else {
            return Ok(None);
        };
        let message = decode_payload(self.format, &payload)?;
        self.received += 1;
        Ok(Some(message))
    }
}
