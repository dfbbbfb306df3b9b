//! Varint length-prefixed frame format.
//!
//! Frame layout:
//!
//! ```text
//! +-------------------------+----------------------------+
//! | payload_len             | payload                    |
//! | varint, 1-10 bytes      | payload_len bytes          |
//! +-------------------------+----------------------------+
//! ```
//!
//! The varint is base-128, least significant group first, with the high bit
//! of each byte set while more bytes follow. There is no delimiter or
//! terminator: the declared length is the only frame boundary.

use crate::error::ProtocolError;
use crate::MAX_FRAME_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Appends the varint encoding of `value` to `buf`.
pub fn encode_varint(mut value: u64, buf: &mut impl BufMut) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Returns the number of bytes `encode_varint` writes for `value`.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Decodes a varint from the front of `bytes` without consuming it.
///
/// Returns `Ok(Some((value, consumed)))` on success and `Ok(None)` if the
/// slice ends before the final byte of the varint.
pub fn decode_varint(bytes: &[u8]) -> Result<Option<(u64, usize)>, ProtocolError> {
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().enumerate() {
        // The tenth byte carries only the 64th bit.
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(ProtocolError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    Ok(None)
}

/// A single frame: an opaque payload with no knowledge of its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
}

impl Frame {
    /// Creates a new frame with the given payload.
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Creates a frame holding the serialized form of a protobuf message.
    pub fn from_message<M: prost::Message>(message: &M) -> Self {
        Self::new(Bytes::from(message.encode_to_vec()))
    }

    /// Total number of bytes this frame occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        varint_len(self.payload.len() as u64) + self.payload.len()
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        check_size(self.payload.len() as u64)?;

        let mut buf = BytesMut::with_capacity(self.encoded_len());
        encode_varint(self.payload.len() as u64, &mut buf);
        buf.put_slice(&self.payload);
        Ok(buf)
    }

    /// Decodes a frame from bytes.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on protocol errors.
    /// Nothing is consumed from `buf` unless a whole frame is available.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        let (payload_len, prefix_len) = match decode_varint(&buf[..])? {
            Some(decoded) => decoded,
            None => return Ok(None),
        };
        check_size(payload_len)?;

        let payload_len = payload_len as usize;
        if buf.len() < prefix_len + payload_len {
            return Ok(None);
        }

        buf.advance(prefix_len);
        let payload = buf.split_to(payload_len).freeze();
        Ok(Some(Self { payload }))
    }
}

pub(crate) fn check_size(len: u64) -> Result<(), ProtocolError> {
    if len > MAX_FRAME_SIZE as u64 {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE as u64,
        });
    }
    Ok(())
}
