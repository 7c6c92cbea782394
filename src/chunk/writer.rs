use crate::chunk::{encode_basic_header, ChunkReader, InboundMessage, MessageStreamIdLayout, MAX_MESSAGE_LENGTH, TYPE0_HEADER_SIZE};
use crate::{ByteBuffer, Error, Result, DEFAULT_CHUNK_SIZE};
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames application messages onto the socket and reads the server's
/// messages back. Every outbound message is one type 0 chunk (plus type 3
/// continuations when the payload exceeds the outbound chunk size),
/// written and flushed in a single call.
pub struct ChunkFramer<S> {
    /// Socket, owned for the lifetime of the framer
    stream: S,

    /// Current chunk size for writing
    chunk_size_out: usize,

    /// Message stream id byte layout
    stream_id_layout: MessageStreamIdLayout,

    /// Inbound chunk state
    reader: ChunkReader,
}

impl<S> ChunkFramer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create new chunk framer over a handshaken stream
    pub fn new(stream: S, stream_id_layout: MessageStreamIdLayout) -> Self {
        ChunkFramer {
            stream,
            chunk_size_out: DEFAULT_CHUNK_SIZE as usize,
            stream_id_layout,
            reader: ChunkReader::new(),
        }
    }

    /// Set outgoing chunk size, once the server has been told about it
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size_out = size.max(1);
    }

    /// Write one message and flush. Returns the number of bytes written.
    pub async fn write_message(
        &mut self,
        chunk_stream_id: u32,
        type_id: u8,
        message_stream_id: u32,
        payload: &[u8],
    ) -> Result<usize> {
        let bytes = encode_message(
            chunk_stream_id,
            type_id,
            message_stream_id,
            payload,
            self.chunk_size_out,
            self.stream_id_layout,
        )?;

        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;

        trace!(
            "wrote message csid={} type={} msid={} len={} ({} bytes on wire)",
            chunk_stream_id,
            type_id,
            message_stream_id,
            payload.len(),
            bytes.len()
        );
        Ok(bytes.len())
    }

    /// Read the next complete message, reassembling continuation chunks
    pub async fn read_message(&mut self) -> Result<InboundMessage> {
        self.reader.read_message(&mut self.stream).await
    }

    /// Read exactly `len` bytes without interpreting them
    pub async fn read_fixed(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        self.stream.read_exact(&mut bytes).await?;
        Ok(bytes)
    }

    /// One read of at most `max` bytes. A closed socket is an error.
    pub async fn read_available(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; max];
        let n = self.stream.read(&mut bytes).await?;
        if n == 0 {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }
        bytes.truncate(n);
        Ok(bytes)
    }

    /// Mutable access to the underlying stream
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

/// Build the bytes for one message: a 12-byte type 0 header followed by
/// the payload, split into type 3 continuation chunks past `chunk_size`.
/// The timestamp field is always zero.
pub fn encode_message(
    chunk_stream_id: u32,
    type_id: u8,
    message_stream_id: u32,
    payload: &[u8],
    chunk_size: usize,
    stream_id_layout: MessageStreamIdLayout,
) -> Result<Vec<u8>> {
    let length = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_MESSAGE_LENGTH)
        .ok_or_else(|| Error::chunk(format!("Message of {} bytes is too long", payload.len())))?;

    let chunk_size = chunk_size.max(1);
    let continuations = payload.len().saturating_sub(1) / chunk_size;
    let mut buffer = ByteBuffer::with_capacity(TYPE0_HEADER_SIZE + payload.len() + continuations * 3);

    buffer.write_bytes(&encode_basic_header(0, chunk_stream_id)?)?;
    // Timestamp (3 bytes)
    buffer.write_u24_be(0)?;
    // Message length (3 bytes)
    buffer.write_u24_be(length)?;
    // Message type (1 byte)
    buffer.write_u8(type_id)?;
    // Message stream ID (4 bytes)
    stream_id_layout.write(&mut buffer, message_stream_id)?;

    let continuation_header = encode_basic_header(3, chunk_stream_id)?;
    for (index, piece) in payload.chunks(chunk_size).enumerate() {
        if index > 0 {
            buffer.write_bytes(&continuation_header)?;
        }
        buffer.write_bytes(piece)?;
    }

    Ok(buffer.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[test]
    fn test_single_chunk_layout() {
        let payload = vec![0x5A; 29];
        let bytes = encode_message(3, 0x14, 1, &payload, 128, MessageStreamIdLayout::LittleEndian).unwrap();

        assert_eq!(bytes.len(), 12 + payload.len());
        assert_eq!(bytes[0], 0x03);
        assert_eq!(&bytes[1..4], &[0, 0, 0]);
        assert_eq!(&bytes[4..7], &[0x00, 0x00, 0x1D]);
        assert_eq!(bytes[7], 0x14);
        assert_eq!(&bytes[8..12], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(&bytes[12..], payload.as_slice());
    }

    #[test]
    fn test_legacy_stream_id_layout() {
        let bytes = encode_message(3, 0x14, 1, &[1, 2], 128, MessageStreamIdLayout::BigEndian).unwrap();
        assert_eq!(&bytes[8..12], &[0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_split_into_continuations() {
        let payload: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        let bytes = encode_message(6, 0x09, 1, &payload, 128, MessageStreamIdLayout::LittleEndian).unwrap();

        // 12 header + 128 + (1 + 128) + (1 + 44)
        assert_eq!(bytes.len(), 12 + 300 + 2);
        assert_eq!(&bytes[4..7], &[0x00, 0x01, 0x2C]);
        assert_eq!(bytes[12 + 128], 0xC6);
        assert_eq!(bytes[12 + 128 + 1 + 128], 0xC6);
        assert_eq!(&bytes[12..140], &payload[..128]);
        assert_eq!(&bytes[141..269], &payload[128..256]);
    }

    #[test]
    fn test_payload_at_chunk_size_is_single_chunk() {
        let payload = vec![0u8; 4096];
        let bytes = encode_message(6, 0x09, 1, &payload, 4096, MessageStreamIdLayout::LittleEndian).unwrap();
        assert_eq!(bytes.len(), 12 + 4096);
    }

    #[tokio::test]
    async fn test_write_message_is_one_flushed_write() {
        let (client, mut server) = duplex(4096);
        let mut framer = ChunkFramer::new(client, MessageStreamIdLayout::LittleEndian);

        let written = framer.write_message(2, 0x01, 0, &4096u32.to_be_bytes()).await.unwrap();
        assert_eq!(written, 16);

        let mut received = vec![0u8; 16];
        server.read_exact(&mut received).await.unwrap();
        assert_eq!(received[0], 0x02);
        assert_eq!(received[7], 0x01);
        assert_eq!(&received[12..], &[0x00, 0x00, 0x10, 0x00]);
    }

    #[tokio::test]
    async fn test_read_available_reports_close() {
        let (client, server) = duplex(64);
        drop(server);

        let mut framer = ChunkFramer::new(client, MessageStreamIdLayout::LittleEndian);
        assert!(framer.read_available(1024).await.is_err());
    }
}
