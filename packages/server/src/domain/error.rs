//! Domain error types.

use thiserror::Error;

/// A frame that could not be turned into a [`Command`](super::Command).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Not JSON, not an object, or fields of the wrong shape.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// Well-formed frame carrying a command this server does not know.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
}

/// Handshake failures. Each one closes the offending connection only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The first command was not `hello`.
    #[error("expected 'hello' as first command, got '{0}'")]
    UnexpectedCommand(String),

    /// The client `hello` did not list a protocol this server speaks.
    #[error("no supported protocol offered (client offered: [{}])", .0.join(", "))]
    UnsupportedProtocol(Vec<String>),

    /// No `hello` arrived in time.
    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Why a push command did not reach a connection's mailbox.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum EnqueueError {
    /// The connection is closing or closed.
    #[error("connection is closed")]
    Closed,

    /// The mailbox stayed full for the whole enqueue deadline.
    #[error("connection did not accept the command in time")]
    TimedOut,
}
