/// Fine-grained progress of one publish session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket
    #[default]
    Disconnected,

    /// Performing handshake
    Handshaking,

    /// Handshake complete, connected
    Connected,

    /// createStream answered with a stream id
    StreamCreated,

    /// Writer loop is forwarding frames
    PublishReady,

    /// Session failed
    Error(String),
}

impl ConnectionState {
    /// Check if connected
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connected | ConnectionState::StreamCreated | ConnectionState::PublishReady
        )
    }

    /// Check if frames can be written
    pub fn can_publish(&self) -> bool {
        *self == ConnectionState::PublishReady
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ConnectionState::Error(_))
    }

    /// Validate transition
    pub fn can_transition_to(&self, next: &ConnectionState) -> bool {
        match (self, next) {
            (ConnectionState::Disconnected, ConnectionState::Handshaking) => true,
            (ConnectionState::Handshaking, ConnectionState::Connected) => true,
            (ConnectionState::Connected, ConnectionState::StreamCreated) => true,
            (ConnectionState::StreamCreated, ConnectionState::PublishReady) => true,
            (current, ConnectionState::Error(_)) => !current.is_error(),
            // Closing the socket ends the session from anywhere
            (_, ConnectionState::Disconnected) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Handshaking => write!(f, "Handshaking"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::StreamCreated => write!(f, "StreamCreated"),
            ConnectionState::PublishReady => write!(f, "PublishReady"),
            ConnectionState::Error(reason) => write!(f, "Error({})", reason),
        }
    }
}
