//! Domain layer: protocol vocabulary, connection lifecycle and the registry contract.
//!
//! Nothing here touches sockets or JSON. The infrastructure layer maps wire
//! frames onto these types and the UI layer drives the state machine.

pub mod command;
pub mod connection;
pub mod error;
pub mod handle;
pub mod handshake;
pub mod registry;

pub use command::{Command, PROTOCOL_OFFICIAL_7, PushCommand, SUPPORTED_PROTOCOLS};
pub use connection::{CloseReason, ConnectionId, ConnectionState};
pub use error::{DecodeError, EnqueueError, ProtocolError};
pub use handle::{COMMAND_QUEUE_CAPACITY, ConnectionHandle, ConnectionMailbox, ENQUEUE_TIMEOUT};
pub use handshake::negotiate;
pub use registry::ConnectionRegistry;

#[cfg(test)]
pub use registry::MockConnectionRegistry;
