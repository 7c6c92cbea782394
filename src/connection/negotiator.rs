use crate::amf::{decode_command_head, extract_stream_id, scan_for_number};
use crate::chunk::{parse_chunk_header, ChunkFramer, InboundMessage};
use crate::protocol::*;
use crate::{Error, Result};
use log::{debug, info, warn};
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};

/// Upper bound on messages read while waiting for one command response
pub const MAX_MESSAGES_PER_RESPONSE: usize = 16;

/// Size of the single read used for command responses in fixed-size mode
pub const FIXED_RESPONSE_READ_SIZE: usize = 1024;

/// How server responses are delimited while negotiating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFraming {
    /// Parse each inbound chunk header and read the declared length
    #[default]
    ChunkHeader,

    /// Read 4/5/6 bytes for the control responses and one block of at
    /// most 1024 bytes for each command response
    FixedSize,
}

/// Message stream id handed out by `createStream`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(i64);

impl StreamId {
    /// No stream id could be found in the response
    pub const INVALID: StreamId = StreamId(-1);

    pub fn new(id: i64) -> Self {
        StreamId(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        self.as_message_stream_id().is_some()
    }

    /// The id as written into chunk headers
    pub fn as_message_stream_id(&self) -> Option<u32> {
        u32::try_from(self.0).ok()
    }

    fn from_amf_number(value: Option<f64>) -> Self {
        match value {
            Some(n) if n.is_finite() && n >= 0.0 && n <= u32::MAX as f64 => StreamId(n as i64),
            _ => StreamId::INVALID,
        }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Values the negotiator announces to the server
#[derive(Debug, Clone)]
pub struct NegotiationSettings {
    pub connect: ConnectParams,
    pub chunk_size: u32,
    pub window_ack_size: u32,
    pub response_framing: ResponseFraming,
}

/// Drives the fixed sequence of messages that turns a handshaken socket
/// into a stream the client may publish on:
///
/// 1. send `connect`
/// 2. read Window Acknowledgement Size
/// 3. send Set Chunk Size
/// 4. read Set Peer Bandwidth
/// 5. send Window Acknowledgement Size
/// 6. read User Control
/// 7. read the `connect` result
/// 8. send `createStream`
/// 9. read the result and take the stream id from it
///
/// Any failure aborts the whole sequence.
pub struct ConnectionNegotiator<'a, S> {
    framer: &'a mut ChunkFramer<S>,
    settings: &'a NegotiationSettings,
    transactions: TransactionIds,

    /// Command response that arrived while a control message was expected
    pending_command: Option<InboundMessage>,
}

impl<'a, S> ConnectionNegotiator<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(framer: &'a mut ChunkFramer<S>, settings: &'a NegotiationSettings) -> Self {
        ConnectionNegotiator {
            framer,
            settings,
            transactions: TransactionIds::new(),
            pending_command: None,
        }
    }

    /// Run all nine steps. Consumes the negotiator; transaction ids are
    /// per connection.
    pub async fn negotiate(mut self) -> Result<StreamId> {
        info!("connect: sendConnectMessage");
        let connect_txn = self
            .send_connect()
            .await
            .map_err(|e| e.into_negotiation("sendConnectMessage"))?;

        info!("connect: waitForWindowAcknowledgement");
        self.await_control(MSG_TYPE_WINDOW_ACK, 4)
            .await
            .map_err(|e| e.into_negotiation("waitForWindowAcknowledgement"))?;

        info!("connect: sendSetChunkSize");
        self.send_set_chunk_size()
            .await
            .map_err(|e| e.into_negotiation("sendSetChunkSize"))?;

        info!("connect: waitForSetPeerBandwidth");
        self.await_control(MSG_TYPE_SET_PEER_BW, 5)
            .await
            .map_err(|e| e.into_negotiation("waitForSetPeerBandwidth"))?;

        info!("connect: sendWindowAcknowledgement");
        self.send_window_ack()
            .await
            .map_err(|e| e.into_negotiation("sendWindowAcknowledgement"))?;

        info!("connect: waitForUserControlMessage");
        self.await_control(MSG_TYPE_USER_CONTROL, 6)
            .await
            .map_err(|e| e.into_negotiation("waitForUserControlMessage"))?;

        info!("connect: waitForConnectResult");
        self.await_connect_result(connect_txn)
            .await
            .map_err(|e| e.into_negotiation("waitForConnectResult"))?;

        info!("connect: createStream");
        let stream_id = self
            .create_stream()
            .await
            .map_err(|e| e.into_negotiation("createStream"))?;

        info!("Created stream with ID: {}", stream_id);
        Ok(stream_id)
    }

    async fn send_command(&mut self, command: &Command) -> Result<()> {
        let payload = command.encode()?;
        self.framer
            .write_message(CHUNK_STREAM_COMMAND, MSG_TYPE_COMMAND_AMF0, COMMAND_MESSAGE_STREAM_ID, &payload)
            .await?;
        debug!("sent {} (transaction {})", command.name, command.transaction_id);
        Ok(())
    }

    async fn send_control(&mut self, message: ControlMessage) -> Result<()> {
        self.framer
            .write_message(
                CHUNK_STREAM_PROTOCOL,
                message.message_type(),
                CONTROL_MESSAGE_STREAM_ID,
                &message.encode(),
            )
            .await?;
        debug!("sent {:?}", message);
        Ok(())
    }

    async fn send_connect(&mut self) -> Result<u32> {
        let txn = self.transactions.next_id();
        let command = Command::connect(txn, &self.settings.connect);
        self.send_command(&command).await?;
        Ok(txn)
    }

    async fn send_set_chunk_size(&mut self) -> Result<()> {
        let size = self.settings.chunk_size;
        self.send_control(ControlMessage::SetChunkSize(size)).await?;
        self.framer.set_chunk_size(size as usize);
        Ok(())
    }

    async fn send_window_ack(&mut self) -> Result<()> {
        let window = self.settings.window_ack_size;
        self.send_control(ControlMessage::WindowAckSize(window)).await
    }

    /// Read the control message expected at this step.
    ///
    /// In fixed-size mode exactly `fixed_len` bytes are consumed. Otherwise
    /// one whole message is read; a different message type is tolerated,
    /// and a command arriving early is kept for the next command step.
    async fn await_control(&mut self, expected: u8, fixed_len: usize) -> Result<()> {
        match self.settings.response_framing {
            ResponseFraming::FixedSize => {
                let bytes = self.framer.read_fixed(fixed_len).await?;
                debug!("{}: {:02x?}", message_type_name(expected), bytes);
            }
            ResponseFraming::ChunkHeader => {
                if self.pending_command.is_some() {
                    debug!("{}: skipped, server already answered connect", message_type_name(expected));
                    return Ok(());
                }

                let message = self.framer.read_message().await?;
                let actual = message.message_type();

                if actual == expected {
                    let control = ControlMessage::parse(actual, &message.payload)?;
                    debug!("received {:?}", control);
                } else if actual == MSG_TYPE_COMMAND_AMF0 {
                    warn!(
                        "expected {}, server sent a command; keeping it for the next response",
                        message_type_name(expected)
                    );
                    self.pending_command = Some(message);
                } else {
                    warn!(
                        "expected {}, received {} ({} bytes)",
                        message_type_name(expected),
                        message_type_name(actual),
                        message.payload.len()
                    );
                }
            }
        }
        Ok(())
    }

    /// Read messages until a command response arrives
    async fn read_command_response(&mut self, expected_txn: u32) -> Result<InboundMessage> {
        for _ in 0..MAX_MESSAGES_PER_RESPONSE {
            let message = match self.pending_command.take() {
                Some(message) => message,
                None => self.framer.read_message().await?,
            };

            if message.message_type() != MSG_TYPE_COMMAND_AMF0 {
                debug!(
                    "ignoring {} while waiting for a command response",
                    message_type_name(message.message_type())
                );
                continue;
            }

            let head = decode_command_head(&message.payload)?;
            match head.name.as_str() {
                CMD_RESULT => {
                    if head.transaction_id != expected_txn as f64 {
                        warn!(
                            "_result for transaction {} while waiting for {}",
                            head.transaction_id, expected_txn
                        );
                    }
                    return Ok(message);
                }
                CMD_ERROR => {
                    return Err(Error::negotiation(format!(
                        "server rejected transaction {}",
                        head.transaction_id
                    )));
                }
                other => debug!("ignoring server command {}", other),
            }
        }

        Err(Error::negotiation(format!(
            "no response to transaction {} within {} messages",
            expected_txn, MAX_MESSAGES_PER_RESPONSE
        )))
    }

    async fn await_connect_result(&mut self, connect_txn: u32) -> Result<()> {
        match self.settings.response_framing {
            ResponseFraming::FixedSize => {
                let bytes = self.framer.read_available(FIXED_RESPONSE_READ_SIZE).await?;
                debug!("waitForConnectResult: {} bytes", bytes.len());
            }
            ResponseFraming::ChunkHeader => {
                self.read_command_response(connect_txn).await?;
            }
        }
        Ok(())
    }

    async fn create_stream(&mut self) -> Result<StreamId> {
        let txn = self.transactions.next_id();
        self.send_command(&Command::create_stream(txn)).await?;

        let number = match self.settings.response_framing {
            ResponseFraming::FixedSize => {
                let bytes = self.framer.read_available(FIXED_RESPONSE_READ_SIZE).await?;
                match parse_chunk_header(&bytes) {
                    Ok((header, used)) => {
                        let end = (used + header.message_length as usize).min(bytes.len());
                        extract_stream_id(&bytes[used..end])?
                    }
                    Err(e) => {
                        warn!("createStream response has no chunk header ({}), scanning", e);
                        scan_for_number(&bytes)
                    }
                }
            }
            ResponseFraming::ChunkHeader => {
                let message = self.read_command_response(txn).await?;
                extract_stream_id(&message.payload)?
            }
        };

        Ok(StreamId::from_amf_number(number))
    }
}
