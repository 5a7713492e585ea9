//! Error types for Tandem Core

use crate::types::PlaybackState;
use thiserror::Error;

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, Error>;

/// Player error types
#[derive(Error, Debug)]
pub enum Error {
    // Engine errors
    #[error("No pipeline available")]
    NoPipeline,

    #[error("Failed to open media: {0}")]
    Open(String),

    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("State change to {state} failed")]
    StateChange { state: PlaybackState },

    // Clock errors
    #[error("Network clock unavailable: {0}")]
    Clock(String),

    // Network errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed message: {0}")]
    Protocol(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Returns true if the pump can keep running after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::StateChange { .. }
                | Error::Clock(_)
                | Error::Transport(_)
                | Error::Protocol(_)
        )
    }

    /// Short machine-readable code, used in CLI output
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NoPipeline => "NO_PIPELINE",
            Error::Open(_) => "OPEN",
            Error::InvalidPath(_) => "INVALID_PATH",
            Error::StateChange { .. } => "STATE_CHANGE",
            Error::Clock(_) => "CLOCK",
            Error::Transport(_) => "TRANSPORT",
            Error::Protocol(_) => "PROTOCOL",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Io(_) => "IO",
            Error::Json(_) => "JSON",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::Transport("unreachable".into()).is_recoverable());
        assert!(Error::StateChange { state: PlaybackState::Playing }.is_recoverable());
        assert!(!Error::NoPipeline.is_recoverable());
        assert!(!Error::InvalidConfig("port".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = Error::StateChange { state: PlaybackState::Ready };
        assert_eq!(err.to_string(), "State change to READY failed");
        assert_eq!(err.error_code(), "STATE_CHANGE");
    }
}
