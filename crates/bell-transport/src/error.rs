//! Error types for the push channel
//!
//! None of these reach the operator: connection failures feed the retry loop,
//! decode failures drop a single message. Both are logged.

use bell_model::DecodeError;

/// Push channel errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not open the socket
    #[error("connect to {endpoint} failed: {message}")]
    Connect {
        /// Endpoint we tried
        endpoint: String,
        /// Underlying cause
        message: String,
    },

    /// Socket opened but the STOMP session was not established
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Server sent an ERROR frame
    #[error("server error: {message}")]
    Server {
        /// `message` header of the ERROR frame
        message: String,
    },

    /// Frame could not be parsed
    #[error("protocol error: {0}")]
    Protocol(String),

    /// WebSocket failure after connect
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Payload was not a notification record
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Server closed the channel
    #[error("channel closed by server")]
    Closed,

    /// Handshake did not finish in time
    #[error("handshake timed out after {duration_secs}s")]
    Timeout {
        /// Seconds waited
        duration_secs: u64,
    },
}

impl TransportError {
    /// Create connect error for endpoint
    pub fn connect(endpoint: impl ToString, cause: impl ToString) -> Self {
        Self::Connect {
            endpoint: endpoint.to_string(),
            message: cause.to_string(),
        }
    }

    /// Whether the connection is lost (as opposed to a single bad message)
    #[inline]
    #[must_use]
    pub fn is_connection_loss(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_is_not_connection_loss() {
        assert!(!TransportError::Decode(DecodeError::Empty).is_connection_loss());
        assert!(TransportError::Closed.is_connection_loss());
        assert!(TransportError::connect("ws://x", "refused").is_connection_loss());
    }

    #[test]
    fn connect_error_display() {
        let err = TransportError::connect("ws://host/ws", "refused");
        assert_eq!(err.to_string(), "connect to ws://host/ws failed: refused");
    }
}
