/// Lifecycle reported to listeners
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PublisherState {
    /// No session running
    #[default]
    Idle,

    /// Negotiated and forwarding frames
    Running,

    /// Session failed; `initialize` may be called again
    Error(String),
}

impl PublisherState {
    pub fn is_running(&self) -> bool {
        *self == PublisherState::Running
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PublisherState::Error(_))
    }
}

impl std::fmt::Display for PublisherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublisherState::Idle => write!(f, "Idle"),
            PublisherState::Running => write!(f, "Running"),
            PublisherState::Error(reason) => write!(f, "Error({})", reason),
        }
    }
}
