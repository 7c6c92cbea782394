/// One encoded video frame, forwarded to the server untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Encoded bytes
    pub payload: Vec<u8>,

    /// Capture timestamp in milliseconds
    pub timestamp: u32,
}

impl Frame {
    pub fn new(payload: impl Into<Vec<u8>>, timestamp: u32) -> Self {
        Frame {
            payload: payload.into(),
            timestamp,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
