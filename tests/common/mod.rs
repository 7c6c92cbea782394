// Common test utilities: a scripted RTMP server on a loopback socket and a
// listener that forwards publisher events into a channel.

#![allow(dead_code)]

use rtmp::{
    decode_command_head, encode_command, encode_message, Amf0Object, ChunkReader, ConnectionState,
    InboundMessage, MessageStreamIdLayout, PublisherError, PublisherListener, PublisherOutput,
    PublisherState, StreamTarget, HANDSHAKE_SIZE,
};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// What the fake server does after the handshake
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Answer every step; `createStream` gets `stream_id` (or no number)
    Publish { stream_id: Option<f64> },

    /// Read `connect`, then hang up before answering
    CloseAfterConnect,

    /// Read `connect`, then stay silent until the client hangs up
    Stall,
}

/// Start a server for one connection. The task returns every message the
/// client sent, in order.
pub async fn start_server(script: Script) -> (StreamTarget, JoinHandle<Vec<InboundMessage>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        if server_handshake(&mut socket).await.is_err() {
            return Vec::new();
        }
        run_script(&mut socket, script).await
    });

    (StreamTarget::new("127.0.0.1", port).with_app("live"), task)
}

/// A port nobody listens on
pub async fn closed_port_target() -> StreamTarget {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    StreamTarget::new("127.0.0.1", port)
}

async fn server_handshake(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut c0c1 = vec![0u8; 1 + HANDSHAKE_SIZE];
    socket.read_exact(&mut c0c1).await?;
    assert_eq!(c0c1[0], 3, "client must request version 3");

    let s1: Vec<u8> = (0..HANDSHAKE_SIZE).map(|i| (i * 7 % 256) as u8).collect();
    socket.write_all(&[3]).await?;
    socket.write_all(&s1).await?;

    let mut c2 = vec![0u8; HANDSHAKE_SIZE];
    socket.read_exact(&mut c2).await?;
    assert_eq!(c2, s1, "C2 must echo S1");

    // S2 echoes C1
    socket.write_all(&c0c1[1..]).await
}

async fn run_script(socket: &mut TcpStream, script: Script) -> Vec<InboundMessage> {
    let mut reader = ChunkReader::new();
    let mut received = Vec::new();

    // The client may be stopped before it gets to send anything
    let Ok(connect) = reader.read_message(socket).await else {
        return received;
    };
    assert_eq!(decode_command_head(&connect.payload).unwrap().name, "connect");
    received.push(connect);

    match script {
        Script::CloseAfterConnect => return received,
        Script::Stall => {
            while let Ok(message) = reader.read_message(socket).await {
                received.push(message);
            }
            return received;
        }
        Script::Publish { .. } => {}
    }

    let props = Amf0Object::new().with("fmsVer", "FMS/3,0,1,123").with("capabilities", 31.0);
    let responses = [
        server_message(2, 0x05, &2_500_000u32.to_be_bytes()),
        server_message(2, 0x06, &[0x00, 0x26, 0x25, 0xA0, 0x02]),
        server_message(2, 0x04, &[0, 0, 0, 0, 0, 0]),
        server_message(3, 0x14, &encode_command("_result", 1, &props).unwrap()),
    ]
    .concat();
    socket.write_all(&responses).await.unwrap();

    loop {
        let message = reader.read_message(socket).await.unwrap();
        let is_create_stream = message.message_type() == 0x14
            && decode_command_head(&message.payload).unwrap().name == "createStream";
        received.push(message);
        if is_create_stream {
            break;
        }
    }

    if let Script::Publish { stream_id } = script {
        socket.write_all(&create_stream_result(stream_id)).await.unwrap();
    }

    // Everything else until the client hangs up
    while let Ok(message) = reader.read_message(socket).await {
        received.push(message);
    }
    received
}

pub fn server_message(csid: u32, type_id: u8, payload: &[u8]) -> Vec<u8> {
    encode_message(csid, type_id, 0, payload, 128, MessageStreamIdLayout::LittleEndian).unwrap()
}

/// `_result`, 2, null, stream id
pub fn create_stream_result(stream_id: Option<f64>) -> Vec<u8> {
    let mut payload = vec![0x02, 0x00, 0x07];
    payload.extend_from_slice(b"_result");
    payload.push(0x00);
    payload.extend_from_slice(&2.0f64.to_be_bytes());
    payload.push(0x05);
    if let Some(id) = stream_id {
        payload.push(0x00);
        payload.extend_from_slice(&id.to_be_bytes());
    }
    server_message(3, 0x14, &payload)
}

/// Video messages among what the client sent
pub fn video_payloads(messages: &[InboundMessage]) -> Vec<Vec<u8>> {
    messages
        .iter()
        .filter(|m| m.message_type() == 0x09)
        .map(|m| m.payload.clone())
        .collect()
}

#[derive(Debug, Clone)]
pub enum Event {
    State(PublisherState),
    Connection(ConnectionState),
    Output(PublisherOutput),
    Error(PublisherError),
}

/// Forwards every callback into a channel
pub struct ChannelListener {
    events: mpsc::UnboundedSender<Event>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        (ChannelListener { events }, rx)
    }
}

impl PublisherListener for ChannelListener {
    fn on_state(&self, state: &PublisherState) {
        let _ = self.events.send(Event::State(state.clone()));
    }

    fn on_connection_state(&self, state: &ConnectionState) {
        let _ = self.events.send(Event::Connection(state.clone()));
    }

    fn on_output(&self, output: &PublisherOutput) {
        let _ = self.events.send(Event::Output(output.clone()));
    }

    fn on_error(&self, error: &PublisherError) {
        let _ = self.events.send(Event::Error(error.clone()));
    }
}

/// Wait for the first event matching `pred`, returning it and everything
/// skipped before it
pub async fn wait_for(
    events: &mut mpsc::UnboundedReceiver<Event>,
    pred: impl Fn(&Event) -> bool,
) -> (Event, Vec<Event>) {
    let mut skipped = Vec::new();
    let found = tokio::time::timeout(EVENT_TIMEOUT, async {
        while let Some(event) = events.recv().await {
            if pred(&event) {
                return Some(event);
            }
            skipped.push(event);
        }
        None
    })
    .await;

    match found {
        Ok(Some(event)) => (event, skipped),
        other => panic!("event not received ({:?}); saw {:?}", other.is_ok(), skipped),
    }
}

pub async fn wait_for_state(events: &mut mpsc::UnboundedReceiver<Event>, state: &PublisherState) -> Vec<Event> {
    let (_, skipped) = wait_for(events, |e| matches!(e, Event::State(s) if s == state)).await;
    skipped
}

pub async fn wait_for_error_state(events: &mut mpsc::UnboundedReceiver<Event>) -> (String, Vec<Event>) {
    match wait_for(events, |e| matches!(e, Event::State(PublisherState::Error(_)))).await {
        (Event::State(PublisherState::Error(reason)), skipped) => (reason, skipped),
        _ => unreachable!(),
    }
}
