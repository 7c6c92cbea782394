use crate::protocol::constants::*;
use crate::{Error, Result};

/// Protocol control messages exchanged during negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SetChunkSize(u32),
    WindowAckSize(u32),
    SetPeerBandwidth { window: u32, limit_type: u8 },
    UserControl { event_type: u16, stream_id: Option<u32> },
}

impl ControlMessage {
    /// Message type id on the wire
    pub fn message_type(&self) -> u8 {
        match self {
            ControlMessage::SetChunkSize(_) => MSG_TYPE_SET_CHUNK_SIZE,
            ControlMessage::WindowAckSize(_) => MSG_TYPE_WINDOW_ACK,
            ControlMessage::SetPeerBandwidth { .. } => MSG_TYPE_SET_PEER_BW,
            ControlMessage::UserControl { .. } => MSG_TYPE_USER_CONTROL,
        }
    }

    /// Encode the message body
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            ControlMessage::SetChunkSize(size) => (size & 0x7FFF_FFFF).to_be_bytes().to_vec(),
            ControlMessage::WindowAckSize(window) => window.to_be_bytes().to_vec(),
            ControlMessage::SetPeerBandwidth { window, limit_type } => {
                let mut payload = window.to_be_bytes().to_vec();
                payload.push(limit_type);
                payload
            }
            ControlMessage::UserControl { event_type, stream_id } => {
                let mut payload = event_type.to_be_bytes().to_vec();
                if let Some(id) = stream_id {
                    payload.extend_from_slice(&id.to_be_bytes());
                }
                payload
            }
        }
    }

    /// Parse a control message body received from the server
    pub fn parse(message_type: u8, payload: &[u8]) -> Result<Self> {
        let word = |offset: usize| -> Result<u32> {
            payload
                .get(offset..offset + 4)
                .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                .ok_or_else(|| {
                    Error::chunk(format!(
                        "{} payload too short: {} bytes",
                        message_type_name(message_type),
                        payload.len()
                    ))
                })
        };

        match message_type {
            MSG_TYPE_SET_CHUNK_SIZE => {
                let size = word(0)? & 0x7FFF_FFFF;
                if size == 0 {
                    return Err(Error::chunk("Invalid chunk size 0"));
                }
                Ok(ControlMessage::SetChunkSize(size))
            }
            MSG_TYPE_WINDOW_ACK => Ok(ControlMessage::WindowAckSize(word(0)?)),
            MSG_TYPE_SET_PEER_BW => {
                let window = word(0)?;
                let limit_type = *payload
                    .get(4)
                    .ok_or_else(|| Error::chunk("SetPeerBandwidth missing limit type"))?;
                Ok(ControlMessage::SetPeerBandwidth { window, limit_type })
            }
            MSG_TYPE_USER_CONTROL => {
                if payload.len() < 2 {
                    return Err(Error::chunk("UserControl payload too short"));
                }
                let event_type = u16::from_be_bytes([payload[0], payload[1]]);
                let stream_id = word(2).ok();
                Ok(ControlMessage::UserControl { event_type, stream_id })
            }
            other => Err(Error::chunk(format!(
                "Not a control message type: {}",
                other
            ))),
        }
    }
}
