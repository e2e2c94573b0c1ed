//! Shared error type across Disgordian crates.

use thiserror::Error;

/// Coarse error classes (stable strings for logs and metrics labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Dial, read or write failure on the connection.
    Transport,
    /// Peer broke the protocol contract.
    Protocol,
    /// Malformed envelope on the wire.
    Decode,
    /// Session never got past Hello/Identify/Ready.
    Handshake,
    /// Bad configuration.
    Config,
    /// Outbound queue is gone.
    QueueClosed,
    /// Bug or task failure.
    Internal,
}

impl ErrorClass {
    /// String representation used as a log field / metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Transport => "TRANSPORT",
            ErrorClass::Protocol => "PROTOCOL",
            ErrorClass::Decode => "DECODE",
            ErrorClass::Handshake => "HANDSHAKE",
            ErrorClass::Config => "CONFIG",
            ErrorClass::QueueClosed => "QUEUE_CLOSED",
            ErrorClass::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, DisgordianError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum DisgordianError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("outbound queue closed")]
    QueueClosed,
    #[error("internal: {0}")]
    Internal(String),
}

impl DisgordianError {
    /// Map an error to its stable class.
    pub fn class(&self) -> ErrorClass {
        match self {
            DisgordianError::Transport(_) => ErrorClass::Transport,
            DisgordianError::Protocol(_) => ErrorClass::Protocol,
            DisgordianError::Decode(_) => ErrorClass::Decode,
            DisgordianError::Handshake(_) => ErrorClass::Handshake,
            DisgordianError::Config(_) => ErrorClass::Config,
            DisgordianError::QueueClosed => ErrorClass::QueueClosed,
            DisgordianError::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Wrap any error raised while establishing the session.
    ///
    /// Errors that are already `Handshake` pass through unchanged.
    pub fn into_handshake(self) -> Self {
        match self {
            DisgordianError::Handshake(_) => self,
            other => DisgordianError::Handshake(other.to_string()),
        }
    }

    pub fn is_handshake(&self) -> bool {
        matches!(self, DisgordianError::Handshake(_))
    }
}

impl From<serde_json::Error> for DisgordianError {
    fn from(e: serde_json::Error) -> Self {
        DisgordianError::Decode(e.to_string())
    }
}
