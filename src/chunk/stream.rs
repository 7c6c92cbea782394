use crate::chunk::{ChunkHeader, InboundMessage};

/// Inbound state for one chunk stream id
#[derive(Debug, Clone, Default)]
pub struct ChunkStreamContext {
    /// Previous header for this chunk stream
    pub prev_header: Option<ChunkHeader>,

    /// Whether the previous header carried an extended timestamp
    pub extended_timestamp: bool,

    /// Timestamp delta of the previous header; a type 0 header counts its
    /// absolute timestamp as the delta
    pub timestamp_delta: u32,

    /// Partial message being assembled
    pub message_buffer: Vec<u8>,

    /// Bytes remaining for current message
    pub bytes_remaining: usize,

    /// Current message header being assembled
    pub current_header: Option<ChunkHeader>,
}

impl ChunkStreamContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if currently assembling a message
    pub fn is_assembling(&self) -> bool {
        self.bytes_remaining > 0
    }

    /// Start new message
    pub fn start_message(&mut self, header: ChunkHeader) {
        self.current_header = Some(header);
        self.prev_header = Some(header);
        self.bytes_remaining = header.message_length as usize;
        self.message_buffer.clear();
        self.message_buffer.reserve(header.message_length as usize);
    }

    /// Add chunk data; returns the message once its last byte arrived
    pub fn add_chunk_data(&mut self, data: &[u8]) -> Option<InboundMessage> {
        self.message_buffer.extend_from_slice(data);
        self.bytes_remaining = self.bytes_remaining.saturating_sub(data.len());

        if self.bytes_remaining > 0 {
            return None;
        }

        self.current_header.take().map(|header| InboundMessage {
            header,
            payload: std::mem::take(&mut self.message_buffer),
        })
    }
}
