//! Client error types.

use crate::config::ConfigError;
use std::net::SocketAddr;
use stepwire_core::CoreError;
use stepwire_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(ProtocolError),

    #[error("host error: {message}")]
    Host { message: String },

    #[error("host does not support the request: {message}")]
    Unsupported { message: String },

    #[error("step registry error: {0}")]
    Core(#[from] CoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) => ClientError::Io(e),
            other => ClientError::Protocol(other),
        }
    }
}

impl ClientError {
    /// Returns whether the transport failed. The client is unusable afterwards.
    ///
    /// Framing errors that leave the stream at an unknown position count here
    /// too, even though they are reported as [`ClientError::Protocol`].
    pub fn is_connection_error(&self) -> bool {
        match self {
            ClientError::Connect { .. }
            | ClientError::Io(_)
            | ClientError::ConnectionClosed
            | ClientError::Timeout => true,
            ClientError::Protocol(e) => e.desynchronizes_stream(),
            _ => false,
        }
    }

    /// Returns whether the host's reply did not fit the request contract.
    pub fn is_protocol_error(&self) -> bool {
        match self {
            ClientError::Protocol(e) => !e.desynchronizes_stream(),
            ClientError::Unsupported { .. } => true,
            _ => false,
        }
    }
}
