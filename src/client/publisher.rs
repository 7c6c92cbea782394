use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use log::{debug, error, info, trace, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;
use crate::chunk::ChunkFramer;
use crate::client::{
    ClientConfig, Connector, ListenerId, ListenerRegistry, PublisherError, PublisherListener,
    PublisherOutput, PublisherState, StreamTarget, TcpConnector, Transport,
};
use crate::connection::{ConnectionNegotiator, ConnectionState};
use crate::handshake::{perform_handshake, HandshakeParameters};
use crate::media::{FramePump, FrameSink};
use crate::protocol::{CHUNK_STREAM_VIDEO, MSG_TYPE_VIDEO};
use crate::utils::time_delta_ms;
use crate::{Error, Result};

/// Publishes encoded video to an RTMP server.
///
/// `initialize` starts a session task that connects, runs the handshake and
/// the negotiation, then forwards every frame pushed into the returned
/// [`FrameSink`] as a video message. Progress and failures are reported to
/// the registered listeners only.
pub struct RtmpPublisher {
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

/// State visible to both the façade and its session task
struct Shared {
    config: Arc<ClientConfig>,
    connector: Arc<dyn Connector>,
    listeners: ListenerRegistry,
    state: Mutex<PublisherState>,
    connection_state: Mutex<ConnectionState>,

    /// Session whose task has not reported its final state yet
    active: Mutex<Option<Uuid>>,
}

struct Session {
    id: Uuid,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RtmpPublisher {
    /// Publisher with default configuration over TCP
    pub fn new() -> Self {
        let config = ClientConfig::default();
        let connector = Arc::new(TcpConnector::new(config.tcp_nodelay));
        RtmpPublisher::build(config, connector)
    }

    /// Publisher with config, over TCP
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let connector = Arc::new(TcpConnector::new(config.tcp_nodelay));
        Ok(RtmpPublisher::build(config, connector))
    }

    /// Publisher with config over a custom transport
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        config.validate()?;
        Ok(RtmpPublisher::build(config, connector))
    }

    fn build(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        RtmpPublisher {
            shared: Arc::new(Shared {
                config: Arc::new(config),
                connector,
                listeners: ListenerRegistry::new(),
                state: Mutex::new(PublisherState::Idle),
                connection_state: Mutex::new(ConnectionState::Disconnected),
                active: Mutex::new(None),
            }),
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    pub fn add_listener(&self, listener: Arc<dyn PublisherListener>) -> ListenerId {
        self.shared.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    /// Get current state
    pub fn state(&self) -> PublisherState {
        self.shared.state()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared
            .connection_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Start a session and return the sink frames are pushed into.
    ///
    /// Returns immediately; the outcome is reported to listeners. Fails only
    /// when a session is already active or no Tokio runtime is running.
    pub fn initialize(&self, target: StreamTarget) -> Result<FrameSink> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::invalid_state("initialize must be called inside a Tokio runtime"))?;

        let id = Uuid::new_v4();
        {
            let mut active = self.shared.active.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(running) = *active {
                return Err(Error::invalid_state(format!("Session {} is already active", running)));
            }
            *active = Some(id);
        }

        info!("[{}] initialize: publishing to {}", id, target);
        self.shared.reset_connection_state();
        // A retry starts over from Idle, so a repeated failure is reported again
        self.shared.set_state(PublisherState::Idle);

        let pump = FramePump::new(self.shared.config.pump_capacity);
        let sink = pump.sink();
        let (cancel, cancel_rx) = watch::channel(false);

        let shared = self.shared.clone();
        let task = runtime.spawn(run_session(shared, id, target, pump, cancel_rx));

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        *session = Some(Session { id, cancel, task });
        Ok(sink)
    }

    /// Stop the session and wait until its socket is closed.
    ///
    /// A running session ends in `Idle`; one still connecting ends in
    /// `Error`. Does nothing when no session exists.
    pub async fn stop(&self) {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner).take();

        if let Some(session) = session {
            info!("[{}] stop requested", session.id);
            session.cancel.send_replace(true);
            if let Err(e) = session.task.await {
                error!("[{}] session task ended abnormally: {}", session.id, e);
                self.shared.end_session(session.id);
            }
        }
    }
}

impl Default for RtmpPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RtmpPublisher {
    fn drop(&mut self) {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(session) = session {
            session.cancel.send_replace(true);
        }
    }
}

impl Shared {
    fn state(&self) -> PublisherState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_state(&self, next: PublisherState) {
        if self.store_state(&next) {
            self.listeners.notify_state(&next);
        }
    }

    fn store_state(&self, next: &PublisherState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == *next {
            return false;
        }
        *state = next.clone();
        true
    }

    fn set_connection_state(&self, next: ConnectionState) {
        if self.store_connection_state(&next) {
            self.listeners.notify_connection_state(&next);
        }
    }

    fn store_connection_state(&self, next: &ConnectionState) -> bool {
        let mut state = self.connection_state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.can_transition_to(next) {
            warn!("Ignoring connection state change {} -> {}", state, next);
            return false;
        }
        *state = next.clone();
        true
    }

    /// A new session always starts from `Disconnected`
    fn reset_connection_state(&self) {
        let mut state = self.connection_state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = ConnectionState::Disconnected;
    }

    fn end_session(&self, session_id: Uuid) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active == Some(session_id) {
            *active = None;
        }
    }

    /// Store the final states, release the session slot, then notify.
    /// A new `initialize` may start as soon as the slot is free.
    fn finish(&self, session_id: Uuid, connection: ConnectionState, state: PublisherState, error: Option<PublisherError>) {
        let connection_changed = self.store_connection_state(&connection);
        let state_changed = self.store_state(&state);
        self.end_session(session_id);

        if connection_changed {
            self.listeners.notify_connection_state(&connection);
        }
        if state_changed {
            self.listeners.notify_state(&state);
        }
        if let Some(error) = error {
            self.listeners.notify_error(&error);
        }
    }

    fn fail(&self, session_id: Uuid, cause: Error) {
        error!("[{}] session failed: {}", session_id, cause);
        let error = PublisherError::new(cause);
        let reason = error.message.clone();

        self.finish(
            session_id,
            ConnectionState::Error(reason.clone()),
            PublisherState::Error(reason),
            Some(error),
        );
    }
}

/// Body of the session task
async fn run_session(
    shared: Arc<Shared>,
    id: Uuid,
    target: StreamTarget,
    mut pump: FramePump,
    mut cancel: watch::Receiver<bool>,
) {
    let setup = tokio::select! {
        biased;
        _ = cancelled(&mut cancel) => Err(Error::invalid_state("session cancelled")),
        result = establish(&shared, id, &target) => result,
    };

    let (mut framer, message_stream_id) = match setup {
        Ok(established) => established,
        Err(e) => {
            // The socket was closed by `establish` or dropped with it
            pump.shutdown();
            shared.fail(id, e);
            return;
        }
    };

    shared.set_connection_state(ConnectionState::PublishReady);
    shared.set_state(PublisherState::Running);
    info!("[{}] publishing on message stream {}", id, message_stream_id);

    let written = write_frames(&shared, id, &mut framer, message_stream_id, &mut pump, &mut cancel).await;

    pump.shutdown();
    close(framer.get_mut(), id).await;
    drop(framer);

    match written {
        Ok(count) => {
            info!("[{}] stopped after {} frames", id, count);
            shared.finish(id, ConnectionState::Disconnected, PublisherState::Idle, None);
        }
        Err(e) => shared.fail(id, e),
    }
}

/// Connect, handshake and negotiate. On failure the socket is closed
/// before returning.
async fn establish(
    shared: &Shared,
    id: Uuid,
    target: &StreamTarget,
) -> Result<(ChunkFramer<Box<dyn Transport>>, u32)> {
    let config = &shared.config;

    shared.set_connection_state(ConnectionState::Handshaking);
    let mut stream = with_timeout(config.connect_timeout, shared.connector.connect(target), || {
        Error::Io(Error::timed_out("connect"))
    })
    .await?;
    debug!("[{}] connected to {}", id, target);

    let params = HandshakeParameters::now(config.version);
    let handshake = with_timeout(config.handshake_timeout, perform_handshake(&mut stream, params), || {
        Error::handshake_io("Handshake timed out", Error::timed_out("handshake"))
    })
    .await;
    if let Err(e) = handshake {
        close(&mut stream, id).await;
        return Err(e);
    }
    shared.set_connection_state(ConnectionState::Connected);

    let mut framer = ChunkFramer::new(stream, config.stream_id_layout);
    let settings = config.negotiation_settings(target);
    let negotiated = with_timeout(
        config.negotiation_timeout,
        ConnectionNegotiator::new(&mut framer, &settings).negotiate(),
        || Error::negotiation_io("Negotiation timed out", Error::timed_out("negotiation")),
    )
    .await
    .and_then(|stream_id| {
        stream_id.as_message_stream_id().ok_or_else(|| {
            Error::negotiation(format!("createStream returned invalid stream id {}", stream_id))
        })
    });

    match negotiated {
        Ok(message_stream_id) => {
            shared.set_connection_state(ConnectionState::StreamCreated);
            Ok((framer, message_stream_id))
        }
        Err(e) => {
            close(framer.get_mut(), id).await;
            Err(e)
        }
    }
}

/// Drain the pump into the socket until stopped. Returns the number of
/// frames written.
async fn write_frames(
    shared: &Shared,
    id: Uuid,
    framer: &mut ChunkFramer<Box<dyn Transport>>,
    message_stream_id: u32,
    pump: &mut FramePump,
    cancel: &mut watch::Receiver<bool>,
) -> Result<u64> {
    let write_timeout = shared.config.write_timeout;
    let mut count = 0u64;
    let mut last_timestamp = None;

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancelled(cancel) => return Ok(count),
            frame = pump.dequeue() => match frame {
                Some(frame) => frame,
                None => return Ok(count),
            },
        };

        let write = framer.write_message(CHUNK_STREAM_VIDEO, MSG_TYPE_VIDEO, message_stream_id, &frame.payload);
        with_timeout(write_timeout, write, || Error::Io(Error::timed_out("frame write"))).await?;

        count += 1;
        if let Some(previous) = last_timestamp {
            trace!(
                "[{}] frame {} ({} bytes, +{} ms)",
                id,
                count,
                frame.payload.len(),
                time_delta_ms(previous, frame.timestamp)
            );
        }
        last_timestamp = Some(frame.timestamp);

        shared.listeners.notify_output(&PublisherOutput {
            bytes: frame.payload,
            timestamp: frame.timestamp,
        });
    }
}

async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T>>,
    on_timeout: impl FnOnce() -> Error,
) -> Result<T> {
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

/// Resolves once the session is told to stop
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    while !*cancel.borrow_and_update() {
        if cancel.changed().await.is_err() {
            // Publisher dropped
            return;
        }
    }
}

/// Best-effort close of the write side
async fn close<S: AsyncWrite + Unpin + ?Sized>(stream: &mut S, id: Uuid) {
    if let Err(e) = stream.shutdown().await {
        debug!("[{}] closing socket: {}", id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;
    use tokio::sync::mpsc;

    /// Hands out one end of a pipe whose other end is already gone
    struct ClosedPipe;

    #[async_trait::async_trait]
    impl Connector for ClosedPipe {
        async fn connect(&self, _target: &StreamTarget) -> Result<Box<dyn Transport>> {
            let (client, server) = duplex(64);
            drop(server);
            Ok(Box::new(client))
        }
    }

    struct ErrorForwarder(mpsc::UnboundedSender<PublisherError>);

    impl PublisherListener for ErrorForwarder {
        fn on_error(&self, error: &PublisherError) {
            let _ = self.0.send(error.clone());
        }
    }

    #[test]
    fn test_initialize_outside_runtime() {
        let publisher = RtmpPublisher::new();
        let err = publisher.initialize(StreamTarget::new("localhost", 1935)).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(publisher.state(), PublisherState::Idle);
    }

    #[test]
    fn test_with_connector_validates_config() {
        let config = ClientConfig { pump_capacity: 0, ..ClientConfig::default() };
        assert!(RtmpPublisher::with_connector(config, Arc::new(ClosedPipe)).is_err());
    }

    #[test]
    fn test_remove_listener() {
        let publisher = RtmpPublisher::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = publisher.add_listener(Arc::new(ErrorForwarder(tx)));

        assert!(publisher.remove_listener(id));
        assert!(!publisher.remove_listener(id));
    }

    #[tokio::test]
    async fn test_handshake_failure_reported() {
        let publisher = RtmpPublisher::with_connector(ClientConfig::default(), Arc::new(ClosedPipe)).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        publisher.add_listener(Arc::new(ErrorForwarder(tx)));

        publisher.initialize(StreamTarget::new("localhost", 1935)).unwrap();

        let error = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert!(matches!(*error.cause, Error::Handshake { .. }));
        assert!(publisher.state().is_error());
        assert!(publisher.connection_state().is_error());

        // The slot is free again
        publisher.stop().await;
        assert!(publisher.initialize(StreamTarget::new("localhost", 1935)).is_ok());
        publisher.stop().await;
    }
}
