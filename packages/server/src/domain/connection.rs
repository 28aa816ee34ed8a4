//! Connection identity and lifecycle.

use std::fmt;

use uuid::Uuid;

/// Opaque identity of one client socket. Never reused after the socket closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh, random identity.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a connection.
///
/// ```text
/// Connecting -> AwaitingHandshake -> Live -> Closing -> Closed
///                       \________________________^
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket accepted, nothing exchanged yet.
    Connecting,
    /// Waiting for the client `hello`.
    AwaitingHandshake,
    /// Handshake done; reload/alert commands are forwarded to the socket.
    Live,
    /// Releasing the socket and leaving the registry.
    Closing,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    /// Whether the state machine may move from `self` to `next`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Connecting, AwaitingHandshake)
                | (Connecting, Closing)
                | (AwaitingHandshake, Live)
                | (AwaitingHandshake, Closing)
                | (Live, Closing)
                | (Closing, Closed)
        )
    }

    /// Only live connections write reload/alert frames.
    pub fn accepts_commands(self) -> bool {
        self == ConnectionState::Live
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::AwaitingHandshake => "awaiting-handshake",
            ConnectionState::Live => "live",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a connection left the `Live`/`AwaitingHandshake` states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a close frame or the stream ended.
    ClientDisconnected,
    /// Malformed frame, unsupported protocol or out-of-order handshake.
    ProtocolViolation,
    /// Socket read or write failure.
    TransportError,
    /// The server is shutting down.
    ServerShutdown,
    /// Closed on request through the connection handle.
    Requested,
}

impl CloseReason {
    /// WebSocket close code (RFC 6455 §7.4.1) sent with the close frame.
    pub fn code(self) -> u16 {
        match self {
            CloseReason::ClientDisconnected | CloseReason::Requested => 1000,
            CloseReason::ServerShutdown => 1001,
            CloseReason::ProtocolViolation => 1002,
            CloseReason::TransportError => 1011,
        }
    }

    /// Whether a close frame can still be delivered to the peer.
    pub fn should_send_close_frame(self) -> bool {
        !matches!(
            self,
            CloseReason::ClientDisconnected | CloseReason::TransportError
        )
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CloseReason::ClientDisconnected => "client disconnected",
            CloseReason::ProtocolViolation => "protocol violation",
            CloseReason::TransportError => "transport error",
            CloseReason::ServerShutdown => "server shutdown",
            CloseReason::Requested => "closed by server",
        };
        f.write_str(text)
    }
}
