//! TcpTransport - accept loop, per-connection call dispatch

use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::Arc;

use contracts::{
    ChannelKind, ContractError, Sample, Status, StatusCode, StreamWriter, WireFormat, WireMessage,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWrite, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::frame::{encode_payload, write_frame, CallMethod, CallRequest};
use crate::codec::WireCodec;
use crate::pump::ActiveStream;
use crate::{AdcRequest, SensorService, StreamError, StreamRequest};

/// Longest accepted request line
const MAX_REQUEST_LINE: u64 = 4096;

/// Writer that sends every item as one frame
pub struct FrameWriter<M, W = OwnedWriteHalf> {
    peer: String,
    inner: W,
    format: WireFormat,
    _message: PhantomData<fn(M)>,
}

impl<M, W> FrameWriter<M, W>
where
    M: Into<WireMessage>,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(peer: impl Into<String>, inner: W, format: WireFormat) -> Self {
        Self {
            peer: peer.into(),
            inner,
            format,
            _message: PhantomData,
        }
    }

    /// Send the call status (first frame of every response)
    pub async fn write_status(&mut self, status: &Status) -> Result<(), ContractError> {
        let payload = encode_payload(self.format, status)?;
        write_frame(&mut self.inner, &payload)
            .await
            .map_err(|e| ContractError::transport_write(&self.peer, e.to_string()))
    }
}

impl<M, W> StreamWriter for FrameWriter<M, W>
where
    M: Into<WireMessage> + Send + 'static,
    W: AsyncWrite + Unpin + Send,
{
    type Item = M;

    fn peer(&self) -> &str {
        &self.peer
    }

    async fn write(&mut self, item: M) -> Result<(), ContractError> {
        let message: WireMessage = item.into();
        let payload = encode_payload(self.format, &message)?;
        write_frame(&mut self.inner, &payload)
            .await
            .map_err(|e| ContractError::transport_write(&self.peer, e.to_string()))
    }
}

/// TCP binding of [`SensorService`]
#[derive(Clone)]
pub struct TcpTransport {
    service: Arc<SensorService>,
    default_format: WireFormat,
}

impl TcpTransport {
    pub fn new(service: Arc<SensorService>, default_format: WireFormat) -> Self {
        Self {
            service,
            default_format,
        }
    }

    pub fn service(&self) -> &Arc<SensorService> {
        &self.service
    }

    /// Accept connections on `listener` until `shutdown` fires
    ///
    /// Every connection runs in its own task with a child token of
    /// `shutdown`; the call returns after all of them have finished.
    ///
    /// # Errors
    /// Only when the listener's local address cannot be read
    #[instrument(name = "tcp_transport_serve", skip_all)]
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ContractError> {
        let local = listener.local_addr()?;
        info!(addr = %local, format = ?self.default_format, "tcp transport listening");

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let transport = self.clone();
                        let cancel = shutdown.child_token();
                        connections.spawn(async move {
                            transport.handle_connection(stream, peer, cancel).await;
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
            while connections.try_join_next().is_some() {}
        }

        info!(open = connections.len(), "tcp transport shutting down");
        while connections.join_next().await.is_some() {}
        info!("tcp transport stopped");
        Ok(())
    }

    #[instrument(name = "tcp_connection", skip(self, stream, cancel), fields(peer = %peer))]
    async fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        cancel: CancellationToken,
    ) {
        let peer = peer.to_string();
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let request = tokio::select! {
            _ = cancel.cancelled() => return,
            request = read_request(&mut reader) => request,
        };
        let request = match request {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("peer closed before sending a request");
                return;
            }
            Err(status) => {
                let mut writer =
                    FrameWriter::<WireMessage, _>::new(&peer, write_half, self.default_format);
                if let Err(e) = writer.write_status(&status).await {
                    debug!(error = %e, "failed to report bad request");
                }
                return;
            }
        };
        debug!(?request, "call received");

        let format = request.format.unwrap_or(self.default_format);
        let watcher = tokio::spawn(watch_eof(reader.into_inner(), cancel.clone()));

        let result = self.dispatch(&request, &peer, write_half, format, &cancel).await;
        if let Err(e) = result {
            debug!(error = %e, "call ended with transport error");
        }
        watcher.abort();
    }

    async fn dispatch(
        &self,
        request: &CallRequest,
        peer: &str,
        write_half: OwnedWriteHalf,
        format: WireFormat,
        cancel: &CancellationToken,
    ) -> Result<(), ContractError> {
        // an absent channel answers Unavailable whatever the method
        if !self.service.registry().is_available(request.channel) {
            let mut writer = FrameWriter::<WireMessage, _>::new(peer, write_half, format);
            let status = StreamError::Unavailable {
                channel: request.channel,
            }
            .into_status();
            return writer.write_status(&status).await;
        }

        let stream_request = StreamRequest {
            queue_size: request.queue_size,
        };
        match (request.method, request.channel) {
            (CallMethod::Stream, ChannelKind::Scan) => {
                let opened = self.service.open_scan(&stream_request);
                run_stream(opened, FrameWriter::new(peer, write_half, format), cancel).await
            }
            (CallMethod::Stream, ChannelKind::Imu) => {
                let opened = self.service.open_imu(&stream_request);
                run_stream(opened, FrameWriter::new(peer, write_half, format), cancel).await
            }
            (CallMethod::Stream, ChannelKind::Camera) => {
                let opened = self.service.open_camera(&stream_request);
                run_stream(opened, FrameWriter::new(peer, write_half, format), cancel).await
            }
            (CallMethod::Read, ChannelKind::Adc) => {
                let mut writer = FrameWriter::<WireMessage, _>::new(peer, write_half, format);
                match self.service.read_adc(&AdcRequest::default()) {
                    Ok(message) => {
                        writer.write_status(&Status::ok()).await?;
                        writer.write(message.into()).await
                    }
                    Err(e) => writer.write_status(&e.into_status()).await,
                }
            }
            (method, channel) => {
                let mut writer = FrameWriter::<WireMessage, _>::new(peer, write_half, format);
                let status = Status::new(
                    StatusCode::InvalidArgument,
                    format!("{channel} does not support {method:?} calls"),
                );
                writer.write_status(&status).await
            }
        }
    }
}

/// Report the open result, then pump until cancelled or disconnected
async fn run_stream<S, C>(
    opened: Result<ActiveStream<'_, S, C>, StreamError>,
    mut writer: FrameWriter<C::Message>,
    cancel: &CancellationToken,
) -> Result<(), ContractError>
where
    S: Sample,
    C: WireCodec<S>,
{
    match opened {
        Ok(stream) => {
            writer.write_status(&Status::ok()).await?;
            let summary = stream.run(&mut writer, cancel).await;
            debug!(sent = summary.sent, end = summary.end.as_str(), "stream call finished");
            Ok(())
        }
        Err(e) => writer.write_status(&e.into_status()).await,
    }
}

/// Read and parse the request line
///
/// `Err` carries the status to report for a malformed request.
async fn read_request(
    reader: &mut BufReader<OwnedReadHalf>,
) -> Result<Option<CallRequest>, Status> {
    let mut line = String::new();
    let read = (&mut *reader)
        .take(MAX_REQUEST_LINE)
        .read_line(&mut line)
        .await
        .map_err(|e| Status::new(StatusCode::InvalidArgument, format!("unreadable request: {e}")))?;
    if read == 0 {
        return Ok(None);
    }
    serde_json::from_str(line.trim())
        .map(Some)
        .map_err(|e| Status::new(StatusCode::InvalidArgument, format!("malformed request: {e}")))
}

/// Cancel `cancel` once the peer closes its side of the connection
async fn watch_eof(mut read_half: OwnedReadHalf, cancel: CancellationToken) {
    let mut buf = [0u8; 256];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => continue,
        }
    }
    debug!("peer closed connection");
    cancel.cancel();
}
