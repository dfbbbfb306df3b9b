//! Connection management.
//!
//! A [`Connection`] owns one TCP stream to the host. Every request/response
//! exchange holds the stream's lock from the first byte written until the
//! response frame has been decoded, so frames from concurrent callers can
//! never interleave.

use crate::config::ConnectionConfig;
use crate::error::ClientError;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use stepwire_protocol::{read_frame, write_frame, ApiMessage, ApiMessageType, ProtocolError};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};

/// Issues message ids derived from the wall clock in milliseconds.
///
/// Ids are strictly increasing per source: when two ids are requested within
/// the same millisecond, the second is bumped past the first.
#[derive(Debug, Default)]
pub struct MessageIdSource {
    last: AtomicI64,
}

impl MessageIdSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

/// Both halves of the socket, only ever used together.
struct Transport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Transport {
    async fn exchange(&mut self, payload: &[u8]) -> Result<Bytes, ProtocolError> {
        write_frame(&mut self.writer, payload).await?;
        read_frame(&mut self.reader).await
    }
}

/// Exclusive hold on the transport for one request/response exchange.
///
/// Dropped before [`complete`](Self::complete) is called, for example when
/// the caller's future is cancelled mid-exchange, it closes the connection:
/// an unread response would otherwise be handed to the next caller.
struct Exchange<'a> {
    transport: MutexGuard<'a, Option<Transport>>,
    connected: &'a AtomicBool,
    completed: bool,
}

impl Exchange<'_> {
    fn complete(mut self) {
        self.completed = true;
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        if !self.completed && self.transport.is_some() {
            tracing::debug!("Exchange abandoned, closing connection");
            self.connected.store(false, Ordering::SeqCst);
            *self.transport = None;
        }
    }
}

/// A connection to the host's API port.
pub struct Connection {
    config: ConnectionConfig,
    /// The socket; `None` once the connection is closed.
    transport: Mutex<Option<Transport>>,
    connected: AtomicBool,
    ids: MessageIdSource,
}

impl Connection {
    /// Opens a connection. Fails if the host is not listening.
    pub async fn open(config: ConnectionConfig) -> Result<Self, ClientError> {
        let addr = config.addr();
        tracing::debug!("Connecting to {}...", addr);

        let connect = TcpStream::connect(addr);
        let result = match config.connect_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, connect).await.map_err(|_| {
                tracing::debug!("Connection timeout");
                ClientError::Timeout
            })?,
            None => connect.await,
        };
        let stream = result.map_err(|source| {
            tracing::debug!("Connection failed: {}", source);
            ClientError::Connect { addr, source }
        })?;

        if config.nodelay {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!("Failed to set TCP_NODELAY: {}", e);
            }
        }

        let (read_half, write_half) = stream.into_split();
        tracing::debug!("Connected to {}", addr);

        Ok(Self {
            config,
            transport: Mutex::new(Some(Transport {
                reader: BufReader::new(read_half),
                writer: write_half,
            })),
            connected: AtomicBool::new(true),
            ids: MessageIdSource::new(),
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns a fresh id for an outgoing request.
    pub fn next_message_id(&self) -> i64 {
        self.ids.next_id()
    }

    /// Writes `request` and waits for the host's response envelope.
    ///
    /// Transport failures close the connection. A response that cannot be
    /// decoded leaves it open, since the frame itself was read in full.
    pub async fn send_and_receive(&self, request: &ApiMessage) -> Result<ApiMessage, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::ConnectionClosed);
        }

        let payload = request.to_bytes();
        let id = request.message_id;

        let mut exchange = Exchange {
            transport: self.transport.lock().await,
            connected: &self.connected,
            completed: false,
        };
        let transport = exchange
            .transport
            .as_mut()
            .ok_or(ClientError::ConnectionClosed)?;

        tracing::debug!(
            "Sending request id={} type={:?} ({} bytes)",
            id,
            request.kind(),
            payload.len()
        );

        let pending = transport.exchange(&payload);
        let result = match self.config.request_timeout() {
            Some(timeout) => match tokio::time::timeout(timeout, pending).await {
                Ok(result) => result.map_err(ClientError::from),
                Err(_) => Err(ClientError::Timeout),
            },
            None => pending.await.map_err(ClientError::from),
        };

        let response_bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                // Dropping the incomplete exchange closes the connection.
                tracing::warn!("Request id={} failed, closing connection: {}", id, e);
                return Err(e);
            }
        };
        exchange.complete();

        let response = ApiMessage::from_bytes(&response_bytes)?;

        tracing::debug!(
            "Request id={} got response id={} type={:?}",
            id,
            response.message_id,
            response.kind()
        );

        // Hosts answer requests they could not parse with a fresh id.
        if self.config.verify_message_id
            && response.message_id != id
            && response.kind()? != ApiMessageType::ErrorResponse
        {
            return Err(ProtocolError::MessageIdMismatch {
                sent: id,
                received: response.message_id,
            }
            .into());
        }

        Ok(response)
    }

    /// Returns whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Closes the connection. Waits for an in-flight exchange to finish.
    pub async fn close(&self) -> Result<(), ClientError> {
        tracing::debug!("Closing connection...");
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut transport) = self.transport.lock().await.take() {
            if let Err(e) = transport.writer.shutdown().await {
                tracing::debug!("Shutdown failed: {}", e);
            }
        }

        tracing::debug!("Connection closed");
        Ok(())
    }
}
