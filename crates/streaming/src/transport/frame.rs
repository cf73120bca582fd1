//! Request line + length-prefixed frames

use std::io;

use contracts::{ChannelKind, ContractError, WireFormat};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame payload (64 MiB)
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Kind of call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallMethod {
    /// Server-streaming call
    Stream,
    /// Unary read
    Read,
}

/// First line sent by the client, as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub method: CallMethod,
    pub channel: ChannelKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_size: Option<u32>,

    /// Frame encoding wanted by the client; absent ⇒ server default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<WireFormat>,
}

impl CallRequest {
    pub fn stream(channel: ChannelKind, queue_size: Option<u32>) -> Self {
        Self {
            method: CallMethod::Stream,
            channel,
            queue_size,
            format: None,
        }
    }

    pub fn read(channel: ChannelKind) -> Self {
        Self {
            method: CallMethod::Read,
            channel,
            queue_size: None,
            format: None,
        }
    }

    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Serialize a frame payload
pub fn encode_payload<T: Serialize>(
    format: WireFormat,
    value: &T,
) -> Result<Vec<u8>, ContractError> {
    match format {
        WireFormat::Bincode => bincode::serialize(value)
            .map_err(|e| ContractError::Other(format!("bincode error: {e}"))),
        WireFormat::Json => serde_json::to_vec(value)
            .map_err(|e| ContractError::Other(format!("json error: {e}"))),
    }
}

/// Deserialize a frame payload
pub fn decode_payload<T: DeserializeOwned>(
    format: WireFormat,
    payload: &[u8],
) -> Result<T, ContractError> {
    match format {
        WireFormat::Bincode => bincode::deserialize(payload)
            .map_err(|e| ContractError::decode(format!("bincode: {e}"))),
        WireFormat::Json => {
            serde_json::from_slice(payload).map_err(|e| ContractError::decode(format!("json: {e}")))
        }
    }
}

/// Write one length-prefixed frame
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds {MAX_FRAME_LEN}", payload.len()),
        ));
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Read one length-prefixed frame; `None` on EOF before a header
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds {MAX_FRAME_LEN}"),
        ));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}
