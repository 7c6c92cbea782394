use crate::{Error, Result};

/// Client-side handshake progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HandshakeState {
    /// Nothing sent yet
    Uninitialized,

    /// C0+C1 written and flushed
    SentC0C1,

    /// S0+S1 read
    ReceivedS0S1,

    /// C2 written and flushed
    SentC2,

    /// S2 read, handshake complete
    Done,

    /// Error occurred
    Failed,
}

impl HandshakeState {
    /// Initial state
    pub fn new() -> Self {
        HandshakeState::Uninitialized
    }

    /// Check if handshake is complete
    pub fn is_done(&self) -> bool {
        *self == HandshakeState::Done
    }

    /// Check if handshake failed
    pub fn is_failed(&self) -> bool {
        *self == HandshakeState::Failed
    }

    /// Transition to next state
    pub fn transition(&mut self, event: HandshakeEvent) -> Result<()> {
        let next = match (*self, event) {
            (HandshakeState::Uninitialized, HandshakeEvent::SentC0C1) => HandshakeState::SentC0C1,
            (HandshakeState::SentC0C1, HandshakeEvent::ReceivedS0S1) => HandshakeState::ReceivedS0S1,
            (HandshakeState::ReceivedS0S1, HandshakeEvent::SentC2) => HandshakeState::SentC2,
            (HandshakeState::SentC2, HandshakeEvent::ReceivedS2) => HandshakeState::Done,
            (_, HandshakeEvent::Error) => HandshakeState::Failed,
            _ => {
                return Err(Error::handshake(format!(
                    "Invalid transition from {:?} with event {:?}",
                    self, event
                )));
            }
        };
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum HandshakeEvent {
    SentC0C1,
    ReceivedS0S1,
    SentC2,
    ReceivedS2,
    Error,
}
