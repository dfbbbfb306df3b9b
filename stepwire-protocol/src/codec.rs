//! Frame I/O over async byte streams, plus buffer-based envelope codecs.

use crate::error::ProtocolError;
use crate::frame::{check_size, encode_varint, Frame, MAX_VARINT_LEN};
use crate::message::ApiMessage;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Writes `payload` as one frame: the varint length prefix, then the bytes.
///
/// The prefix and the payload are each flushed. A failure part way through
/// leaves the stream at an unknown frame boundary; nothing is retried.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    check_size(payload.len() as u64)?;

    let mut prefix = BytesMut::with_capacity(MAX_VARINT_LEN);
    encode_varint(payload.len() as u64, &mut prefix);
    writer.write_all(&prefix).await?;
    writer.flush().await?;

    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads a varint one byte at a time, never consuming past its last byte.
pub async fn read_varint<R>(reader: &mut R) -> Result<u64, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let byte = reader.read_u8().await?;
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(ProtocolError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ProtocolError::VarintOverflow)
}

/// Reads one frame and returns exactly its declared payload.
///
/// Blocks until the whole frame has arrived. End of stream before that
/// surfaces as an I/O error of kind `UnexpectedEof`.
pub async fn read_frame<R>(reader: &mut R) -> Result<Bytes, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let len = read_varint(reader).await?;
    check_size(len)?;

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Bytes::from(payload))
}

/// Encodes envelopes into frames.
pub struct Encoder;

impl Encoder {
    /// Encodes an envelope into a complete frame.
    pub fn encode_message(message: &ApiMessage) -> Result<BytesMut, ProtocolError> {
        Frame::from_message(message).encode()
    }
}

/// Decodes frames and envelopes from an incrementally filled buffer.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame from the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        Frame::decode(&mut self.buffer)
    }

    /// Attempts to decode the next envelope from the buffer.
    pub fn decode_message(&mut self) -> Result<Option<ApiMessage>, ProtocolError> {
        match self.decode_frame()? {
            Some(frame) => Ok(Some(ApiMessage::from_bytes(&frame.payload)?)),
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ApiMessageType, ProtoStepValue};
    use proptest::prelude::*;
    use std::io::ErrorKind;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[tokio::test]
    async fn test_stream_roundtrip() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"hello").await.unwrap();
        assert_eq!(wire[0], 5);

        let mut reader = &wire[..];
        let payload = read_frame(&mut reader).await.unwrap();
        assert_eq!(&payload[..], b"hello");
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn test_stream_empty_payload() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"").await.unwrap();
        assert_eq!(wire, vec![0x00]);

        let mut reader = &wire[..];
        assert!(read_frame(&mut reader).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_boundary_lengths() {
        for len in [127usize, 128, 16383, 16384] {
            let payload = vec![0xABu8; len];
            let mut wire = Vec::new();
            write_frame(&mut wire, &payload).await.unwrap();

            let mut reader = &wire[..];
            let decoded = read_frame(&mut reader).await.unwrap();
            assert_eq!(decoded.len(), len);
            assert_eq!(&decoded[..], &payload[..]);
        }
    }

    #[tokio::test]
    async fn test_read_stops_at_declared_length() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"first").await.unwrap();
        write_frame(&mut wire, b"second").await.unwrap();

        let mut reader = &wire[..];
        assert_eq!(&read_frame(&mut reader).await.unwrap()[..], b"first");
        assert_eq!(&read_frame(&mut reader).await.unwrap()[..], b"second");
    }

    #[tokio::test]
    async fn test_eof_inside_varint() {
        let wire = [0x80u8];
        let mut reader = &wire[..];
        match read_frame(&mut reader).await {
            Err(ProtocolError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected EOF, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_eof_inside_payload() {
        let wire = [0x05u8, b'a', b'b'];
        let mut reader = &wire[..];
        match read_frame(&mut reader).await {
            Err(ProtocolError::Io(e)) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected EOF, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_eof_on_clean_close() {
        let mut reader: &[u8] = &[];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_prefix_rejected() {
        let mut wire = Vec::new();
        encode_varint(crate::MAX_FRAME_SIZE as u64 + 1, &mut wire);
        let mut reader = &wire[..];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_overlong_varint_rejected() {
        let wire = [0xFFu8; 12];
        let mut reader = &wire[..];
        assert!(matches!(
            read_varint(&mut reader).await,
            Err(ProtocolError::VarintOverflow)
        ));
    }

    #[tokio::test]
    async fn test_stream_and_buffer_forms_agree() {
        let message = ApiMessage::step_value_request(11, "a step", false);

        let mut wire = Vec::new();
        write_frame(&mut wire, &message.to_bytes()).await.unwrap();
        let encoded = Encoder::encode_message(&message).unwrap();
        assert_eq!(&wire[..], &encoded[..]);
    }

    #[test]
    fn test_decoder_partial_message() {
        let message = ApiMessage::step_value_response(4, ProtoStepValue::new("say {} to {}"));
        let encoded = Encoder::encode_message(&message).unwrap();

        let mut decoder = Decoder::new();
        decoder.extend(&encoded[..3]);
        assert!(decoder.decode_message().unwrap().is_none());
        assert_eq!(decoder.buffered(), 3);

        decoder.extend(&encoded[3..]);
        let decoded = decoder.decode_message().unwrap().unwrap();
        assert_eq!(decoded.kind().unwrap(), ApiMessageType::GetStepValueResponse);
        assert_eq!(decoded.message_id, 4);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decoder_clear() {
        let mut decoder = Decoder::default();
        decoder.extend(b"\x05abc");
        assert_eq!(decoder.buffered(), 4);
        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
    }

    proptest! {
        #[test]
        fn prop_stream_roundtrip(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let decoded = block_on(async {
                let mut wire = Vec::new();
                write_frame(&mut wire, &payload).await.unwrap();
                let mut reader = &wire[..];
                read_frame(&mut reader).await.unwrap()
            });
            prop_assert_eq!(&decoded[..], &payload[..]);
        }
    }
}
