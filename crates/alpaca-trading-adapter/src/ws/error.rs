/*
[INPUT]:  Failures from the socket layer, frame decoding and stream lifecycle
[OUTPUT]: StreamError with recoverability classification
[POS]:    WebSocket layer - error type for the trading stream
[UPDATE]: When adding new stream failure modes
*/

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised by the trading stream
#[derive(Error, Debug)]
pub enum StreamError {
    /// Inbound bytes were not a JSON object
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Authorization reply carried a status other than "authorized"
    #[error("Authentication failed (status {status})")]
    Authentication { status: String },

    /// Socket connect, send or receive failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// A handler could not be registered with the session
    #[error("Handler registration failed: {0}")]
    HandlerRegistration(String),

    /// stop() was called before run() started
    #[error("Stream supervisor is not running")]
    SupervisorNotRunning,

    /// run() was called while the supervisor was already running
    #[error("Stream supervisor is already running")]
    AlreadyRunning,

    /// The blocking runner could not build its runtime
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl StreamError {
    /// Recoverable errors end the current connection attempt and are retried
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StreamError::MalformedFrame(_)
                | StreamError::Authentication { .. }
                | StreamError::Transport(_)
        )
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        StreamError::Transport(message.into())
    }
}

impl From<tungstenite::Error> for StreamError {
    fn from(err: tungstenite::Error) -> Self {
        StreamError::Transport(err.to_string())
    }
}

/// Result type alias for stream operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(StreamError::MalformedFrame("eof".to_string()).is_recoverable());
        assert!(
            StreamError::Authentication {
                status: "unauthorized".to_string()
            }
            .is_recoverable()
        );
        assert!(StreamError::transport("reset").is_recoverable());
        assert!(!StreamError::SupervisorNotRunning.is_recoverable());
        assert!(!StreamError::HandlerRegistration("closed".to_string()).is_recoverable());
    }

    #[test]
    fn test_tungstenite_error_maps_to_transport() {
        let err: StreamError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, StreamError::Transport(_)));
    }
}
