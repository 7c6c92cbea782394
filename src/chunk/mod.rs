mod stream;
mod reader;
mod writer;

pub use stream::*;
pub use reader::*;
pub use writer::*;

use crate::{ByteBuffer, Error, Result};

/// Size of a type 0 chunk header with a one-byte basic header
pub const TYPE0_HEADER_SIZE: usize = 12;

/// Largest value the 24-bit length and timestamp fields can hold
pub const MAX_MESSAGE_LENGTH: u32 = 0xFF_FFFF;

/// Header of one RTMP message as carried by its first chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub chunk_stream_id: u32,
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type: u8,
    pub message_stream_id: u32,
}

/// A complete message read from the server
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub header: ChunkHeader,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn message_type(&self) -> u8 {
        self.header.message_type
    }
}

/// Byte layout of the 4-byte message stream id in type 0 headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageStreamIdLayout {
    /// RTMP conformant: least significant byte first
    #[default]
    LittleEndian,

    /// Legacy layout: zeros followed by the id, low byte last
    BigEndian,
}

impl MessageStreamIdLayout {
    fn write(&self, buffer: &mut ByteBuffer, id: u32) -> Result<()> {
        match self {
            MessageStreamIdLayout::LittleEndian => buffer.write_u32_le(id)?,
            MessageStreamIdLayout::BigEndian => buffer.write_u32_be(id)?,
        }
        Ok(())
    }
}

/// Encode the basic header (fmt + chunk stream id)
pub fn encode_basic_header(fmt: u8, cs_id: u32) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(3);

    match cs_id {
        2..=63 => {
            // 1-byte header
            result.push((fmt << 6) | (cs_id as u8));
        }
        64..=319 => {
            // 2-byte header
            result.push(fmt << 6);
            result.push((cs_id - 64) as u8);
        }
        320..=65599 => {
            // 3-byte header
            result.push((fmt << 6) | 1);
            let id = cs_id - 64;
            result.push((id & 0xFF) as u8);
            result.push((id >> 8) as u8);
        }
        _ => return Err(Error::chunk(format!("Invalid chunk stream id: {}", cs_id))),
    }

    Ok(result)
}

/// Parse a type 0 chunk header at the start of `bytes`.
///
/// Used when a response was read as an opaque block; returns the header
/// and the number of bytes it occupied.
pub fn parse_chunk_header(bytes: &[u8]) -> Result<(ChunkHeader, usize)> {
    let first_byte = *bytes.first().ok_or_else(|| Error::chunk("Empty chunk header"))?;
    let fmt = (first_byte >> 6) & 0x03;
    if fmt != 0 {
        return Err(Error::chunk(format!(
            "Expected a type 0 chunk header, found fmt {}",
            fmt
        )));
    }

    let (cs_id, offset) = match first_byte & 0x3F {
        0 if bytes.len() > 1 => ((bytes[1] as u32) + 64, 2),
        1 if bytes.len() > 2 => {
            let id = u16::from_le_bytes([bytes[1], bytes[2]]) as u32;
            (id + 64, 3)
        }
        0 | 1 => return Err(Error::chunk("Truncated basic header")),
        n => (n as u32, 1),
    };

    let mut buffer = ByteBuffer::new(bytes[offset..].to_vec());
    let truncated = |_| Error::chunk("Truncated type 0 header");
    let mut timestamp = buffer.read_u24_be().map_err(truncated)?;
    let message_length = buffer.read_u24_be().map_err(truncated)?;
    let message_type = buffer.read_u8().map_err(truncated)?;
    let message_stream_id = buffer.read_u32_le().map_err(truncated)?;
    if timestamp == MAX_MESSAGE_LENGTH {
        timestamp = buffer.read_u32_be().map_err(truncated)?;
    }

    let header = ChunkHeader {
        chunk_stream_id: cs_id,
        timestamp,
        message_length,
        message_type,
        message_stream_id,
    };
    Ok((header, offset + buffer.position()))
}
