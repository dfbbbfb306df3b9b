//! # stepwire-protocol
//!
//! Wire protocol spoken between a test runner host and its language plugins.
//!
//! This crate provides:
//! - Varint length-prefixed framing (in-memory and over async streams)
//! - Protobuf envelope (`ApiMessage`) and the step-metadata payloads
//! - Protocol error types and constants

pub mod codec;
pub mod error;
pub mod frame;
pub mod message;

pub use codec::{read_frame, read_varint, write_frame, Decoder, Encoder};
pub use error::ProtocolError;
pub use frame::{decode_varint, encode_varint, varint_len, Frame, MAX_VARINT_LEN};
pub use message::{
    ApiMessage, ApiMessageType, ErrorResponse, GetAllStepsRequest, GetAllStepsResponse,
    GetStepValueRequest, GetStepValueResponse, ProtoStepValue, ProtoTable, ProtoTableRow,
    UnsupportedApiMessageResponse,
};

/// Environment variable through which the host hands out the API port.
pub const PORT_ENV_VAR: &str = "GAUGE_API_PORT";

/// Maximum frame payload size (16 MiB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;
