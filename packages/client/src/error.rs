//! Error types for the LiveReload client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The WebSocket connection could not be opened
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The server refused or botched the handshake. Retrying will not help.
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// An established session ended unexpectedly
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Reconnection attempts were exhausted
    #[error("Failed to reconnect after {0} attempts")]
    ReconnectExhausted(u32),
}

impl ClientError {
    /// Whether reconnecting may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionError(_) | ClientError::ConnectionLost(_)
        )
    }
}
