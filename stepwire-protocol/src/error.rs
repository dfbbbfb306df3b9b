//! Protocol error types.

use crate::message::ApiMessageType;
use thiserror::Error;

/// Protocol-level errors that can occur during framing or envelope handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("varint length prefix exceeds 64 bits")]
    VarintOverflow,

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u64, max: u64 },

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("unknown message type tag: {0}")]
    UnknownMessageType(i32),

    #[error("unexpected message type: expected {expected:?}, got {actual:?}")]
    UnexpectedMessageType {
        expected: ApiMessageType,
        actual: ApiMessageType,
    },

    #[error("message id mismatch: sent {sent}, received {received}")]
    MessageIdMismatch { sent: i64, received: i64 },

    #[error("missing payload for {0:?}")]
    MissingPayload(ApiMessageType),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns whether this error leaves a byte stream at an unknown frame boundary.
    ///
    /// Envelope-level errors are raised only after a complete frame was consumed,
    /// so the stream is still usable after them.
    pub fn desynchronizes_stream(&self) -> bool {
        matches!(
            self,
            ProtocolError::Io(_)
                | ProtocolError::VarintOverflow
                | ProtocolError::FrameTooLarge { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::FrameTooLarge { size: 100, max: 50 };
        assert!(err.to_string().contains("100"));

        let err = ProtocolError::UnknownMessageType(99);
        assert!(err.to_string().contains("99"));

        let err = ProtocolError::UnexpectedMessageType {
            expected: ApiMessageType::GetStepValueResponse,
            actual: ApiMessageType::GetAllStepResponse,
        };
        let msg = err.to_string();
        assert!(msg.contains("GetStepValueResponse"));
        assert!(msg.contains("GetAllStepResponse"));

        let err = ProtocolError::MessageIdMismatch {
            sent: 7,
            received: 8,
        };
        assert!(err.to_string().contains("sent 7"));
    }

    #[test]
    fn test_stream_desync_classification() {
        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert!(ProtocolError::Io(eof).desynchronizes_stream());
        assert!(ProtocolError::VarintOverflow.desynchronizes_stream());
        assert!(ProtocolError::FrameTooLarge { size: 1, max: 0 }.desynchronizes_stream());

        assert!(!ProtocolError::UnknownMessageType(42).desynchronizes_stream());
        assert!(!ProtocolError::MissingPayload(ApiMessageType::GetStepValueResponse)
            .desynchronizes_stream());
    }
}
