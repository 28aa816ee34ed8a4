//! LiveReload server: HTTP routes, connection state machine and server facade.

pub mod connection;
pub mod console;
mod error;
mod handler;
mod server;
pub mod signal;
pub mod state;

pub use error::{ConsoleError, ServerError};
pub use server::Server;
pub use state::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_HOST, DEFAULT_NAME, DEFAULT_PORT};
