use crate::chunk::{ChunkHeader, ChunkStreamContext, InboundMessage, MAX_MESSAGE_LENGTH};
use crate::protocol::{message_type_name, ControlMessage, MSG_TYPE_SET_CHUNK_SIZE};
use crate::{Error, Result, DEFAULT_CHUNK_SIZE};
use log::{debug, trace};
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reassembles messages sent by the server.
///
/// Understands all four chunk header formats and the extended timestamp,
/// and applies Set Chunk Size messages to itself as they arrive.
#[derive(Debug)]
pub struct ChunkReader {
    /// Chunk streams by ID
    chunk_streams: HashMap<u32, ChunkStreamContext>,

    /// Current chunk size for reading
    chunk_size_in: usize,
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkReader {
    /// Create new chunk reader
    pub fn new() -> Self {
        ChunkReader {
            chunk_streams: HashMap::new(),
            chunk_size_in: DEFAULT_CHUNK_SIZE as usize,
        }
    }

    /// Set incoming chunk size
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size_in = size.max(1);
    }

    /// Current incoming chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size_in
    }

    /// Read chunks until one message is complete
    pub async fn read_message<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<InboundMessage> {
        loop {
            if let Some(message) = self.read_chunk(reader).await? {
                trace!(
                    "read message csid={} type={} len={}",
                    message.header.chunk_stream_id,
                    message_type_name(message.message_type()),
                    message.payload.len()
                );

                if message.message_type() == MSG_TYPE_SET_CHUNK_SIZE {
                    if let ControlMessage::SetChunkSize(size) =
                        ControlMessage::parse(MSG_TYPE_SET_CHUNK_SIZE, &message.payload)?
                    {
                        debug!("server set chunk size to {}", size);
                        self.set_chunk_size(size as usize);
                    }
                }
                return Ok(message);
            }
        }
    }

    /// Read next chunk from stream
    pub async fn read_chunk<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> Result<Option<InboundMessage>> {
        // Read basic header (1-3 bytes)
        let first_byte = reader.read_u8().await?;
        let (fmt, cs_id) = read_basic_header(first_byte, reader).await?;

        let context = self.chunk_streams.entry(cs_id).or_default();
        let header = read_message_header(fmt, cs_id, context, reader).await?;

        if !context.is_assembling() {
            context.start_message(header);
            if header.message_length == 0 {
                return Ok(context.add_chunk_data(&[]));
            }
        } else if fmt != 3 {
            return Err(Error::chunk(format!(
                "New type {} header on chunk stream {} before previous message completed",
                fmt, cs_id
            )));
        }

        // Calculate chunk data size
        let chunk_data_size = context.bytes_remaining.min(self.chunk_size_in);

        let mut chunk_data = vec![0u8; chunk_data_size];
        reader.read_exact(&mut chunk_data).await?;

        Ok(context.add_chunk_data(&chunk_data))
    }
}

/// Parse basic header and get chunk stream ID
async fn read_basic_header<R: AsyncRead + Unpin>(first_byte: u8, reader: &mut R) -> Result<(u8, u32)> {
    let fmt = (first_byte >> 6) & 0x03;
    let cs_id = match first_byte & 0x3F {
        0 => {
            // 2-byte form
            (reader.read_u8().await? as u32) + 64
        }
        1 => {
            // 3-byte form
            let mut id_bytes = [0u8; 2];
            reader.read_exact(&mut id_bytes).await?;
            u16::from_le_bytes(id_bytes) as u32 + 64
        }
        n => n as u32,
    };

    Ok((fmt, cs_id))
}

async fn read_u24<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 3];
    reader.read_exact(&mut bytes).await?;
    Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
}

/// Read message header based on format type
async fn read_message_header<R: AsyncRead + Unpin>(
    fmt: u8,
    cs_id: u32,
    context: &mut ChunkStreamContext,
    reader: &mut R,
) -> Result<ChunkHeader> {
    let prev = context.prev_header;
    let requires_prev = || Error::chunk(format!("Type {} header on chunk stream {} with no previous header", fmt, cs_id));

    let mut header = match fmt {
        0 => {
            // Type 0: Full header (11 bytes)
            let timestamp = read_u24(reader).await?;
            let message_length = read_u24(reader).await?;
            let message_type = reader.read_u8().await?;
            let message_stream_id = reader.read_u32_le().await?;

            ChunkHeader {
                chunk_stream_id: cs_id,
                timestamp,
                message_length,
                message_type,
                message_stream_id,
            }
        }
        1 => {
            // Type 1: Same stream ID (7 bytes)
            let prev = prev.ok_or_else(requires_prev)?;
            let delta = read_u24(reader).await?;
            let message_length = read_u24(reader).await?;
            let message_type = reader.read_u8().await?;

            ChunkHeader {
                timestamp: delta,
                message_length,
                message_type,
                ..prev
            }
        }
        2 => {
            // Type 2: Same length and stream ID (3 bytes)
            let prev = prev.ok_or_else(requires_prev)?;
            let delta = read_u24(reader).await?;

            ChunkHeader { timestamp: delta, ..prev }
        }
        _ => {
            // Type 3: No header, reuse everything from previous
            let prev = prev.ok_or_else(requires_prev)?;
            if context.extended_timestamp {
                reader.read_u32().await?;
            }
            if context.is_assembling() {
                return Ok(prev);
            }

            // New message: advance by the previous delta
            return Ok(ChunkHeader {
                timestamp: prev.timestamp.wrapping_add(context.timestamp_delta),
                ..prev
            });
        }
    };

    // Extended timestamp
    context.extended_timestamp = header.timestamp == MAX_MESSAGE_LENGTH;
    if context.extended_timestamp {
        header.timestamp = reader.read_u32().await?;
    }
    context.timestamp_delta = header.timestamp;

    // Deltas are relative to the previous message on this chunk stream
    if fmt != 0 {
        if let Some(prev) = prev {
            header.timestamp = prev.timestamp.wrapping_add(header.timestamp);
        }
    }

    Ok(header)
}
