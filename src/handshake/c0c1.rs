use crate::{ByteBuffer, Result};
use crate::utils::{current_timestamp_secs, generate_random_bytes};

/// RTMP version
pub const RTMP_VERSION: u8 = 3;

/// Handshake packet size (C1/S1/C2/S2)
pub const HANDSHAKE_SIZE: usize = 1536;

/// Inputs of one handshake attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeParameters {
    /// Requested protocol version (C0)
    pub version: u8,

    /// Epoch time in seconds (C1 bytes 0-3)
    pub epoch_time: u32,
}

impl HandshakeParameters {
    pub fn new(version: u8, epoch_time: u32) -> Self {
        HandshakeParameters { version, epoch_time }
    }

    /// Parameters stamped with the current wall clock
    pub fn now(version: u8) -> Self {
        HandshakeParameters::new(version, current_timestamp_secs())
    }
}

impl Default for HandshakeParameters {
    fn default() -> Self {
        HandshakeParameters::now(RTMP_VERSION)
    }
}

/// Client handshake (C0 + C1)
#[derive(Debug, Clone)]
pub struct C0C1 {
    /// RTMP version (C0)
    pub version: u8,

    /// Timestamp (C1)
    pub timestamp: u32,

    /// Random data (C1 bytes 8..1536)
    pub random_data: Vec<u8>,
}

impl C0C1 {
    /// Create C0+C1 for the given parameters
    pub fn create_client(params: HandshakeParameters) -> Self {
        C0C1 {
            version: params.version,
            timestamp: params.epoch_time,
            random_data: generate_random_bytes(HANDSHAKE_SIZE - 8),
        }
    }

    /// Encode to bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = ByteBuffer::with_capacity(1 + HANDSHAKE_SIZE);

        // C0
        buffer.write_u8(self.version)?;

        // C1: time, zero, random
        buffer.write_u32_be(self.timestamp)?;
        buffer.write_u32_be(0)?;
        buffer.write_bytes(&self.random_data)?;

        Ok(buffer.into_vec())
    }
}
