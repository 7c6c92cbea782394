use std::io::{Error as IoError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    #[error("Handshake error: {message}")]
    Handshake {
        message: String,
        #[source]
        source: Option<IoError>,
    },

    #[error("Negotiation error: {message}")]
    Negotiation {
        message: String,
        #[source]
        source: Option<IoError>,
    },

    #[error("AMF encode error: {0}")]
    AmfEncode(String),

    #[error("AMF decode error: {0}")]
    AmfDecode(String),

    #[error("Chunk error: {0}")]
    Chunk(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create a handshake error without an I/O cause
    pub fn handshake(msg: impl Into<String>) -> Self {
        Error::Handshake {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a handshake error wrapping the I/O failure that caused it
    pub fn handshake_io(msg: impl Into<String>, source: IoError) -> Self {
        Error::Handshake {
            message: msg.into(),
            source: Some(source),
        }
    }

    /// Create a negotiation error without an I/O cause
    pub fn negotiation(msg: impl Into<String>) -> Self {
        Error::Negotiation {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a negotiation error wrapping the I/O failure that caused it
    pub fn negotiation_io(msg: impl Into<String>, source: IoError) -> Self {
        Error::Negotiation {
            message: msg.into(),
            source: Some(source),
        }
    }

    /// Create an AMF encode error
    pub fn amf_encode(msg: impl Into<String>) -> Self {
        Error::AmfEncode(msg.into())
    }

    /// Create an AMF decode error
    pub fn amf_decode(msg: impl Into<String>) -> Self {
        Error::AmfDecode(msg.into())
    }

    /// Create a chunk error
    pub fn chunk(msg: impl Into<String>) -> Self {
        Error::Chunk(msg.into())
    }

    /// Create a queue error
    pub fn queue(msg: impl Into<String>) -> Self {
        Error::Queue(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Re-tag a failure from the negotiation phase.
    ///
    /// Errors raised below the negotiator (chunk framing, raw I/O) become
    /// negotiation errors so listeners see which phase failed; errors that
    /// already name a phase pass through untouched.
    pub fn into_negotiation(self, step: &str) -> Self {
        match self {
            Error::Io(e) => Error::negotiation_io(format!("{} failed", step), e),
            Error::Chunk(msg) | Error::AmfDecode(msg) => {
                Error::negotiation(format!("{} failed: {}", step, msg))
            }
            other => other,
        }
    }

    /// Error used when an I/O phase exceeds its configured deadline
    pub fn timed_out(phase: &str) -> IoError {
        IoError::new(ErrorKind::TimedOut, format!("{} timed out", phase))
    }

    /// Whether this error was caused by the peer closing the connection early
    pub fn is_unexpected_eof(&self) -> bool {
        let source = match self {
            Error::Io(e) => Some(e),
            Error::Handshake { source, .. } | Error::Negotiation { source, .. } => source.as_ref(),
            _ => None,
        };
        source.is_some_and(|e| e.kind() == ErrorKind::UnexpectedEof)
    }
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_error_creation() {
        let err = Error::negotiation("unexpected _error response");
        assert_eq!(format!("{}", err), "Negotiation error: unexpected _error response");

        let err = Error::handshake("Version mismatch");
        assert_eq!(format!("{}", err), "Handshake error: Version mismatch");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = IoError::new(ErrorKind::UnexpectedEof, "EOF");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => assert!(err.is_unexpected_eof()),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_handshake_keeps_cause() {
        let cause = IoError::new(ErrorKind::ConnectionReset, "reset by peer");
        let err = Error::handshake_io("Failed to read S1", cause);

        let source = err.source().expect("cause should be attached");
        assert!(source.to_string().contains("reset by peer"));
    }

    #[test]
    fn test_into_negotiation() {
        let err = Error::Io(IoError::new(ErrorKind::UnexpectedEof, "EOF"))
            .into_negotiation("waitForWindowAcknowledgement");
        assert!(matches!(err, Error::Negotiation { source: Some(_), .. }));
        assert!(err.is_unexpected_eof());

        let err = Error::queue("full").into_negotiation("connect");
        assert!(matches!(err, Error::Queue(_)));
    }
}
