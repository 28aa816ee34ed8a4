//! LiveReload protocol client.
//!
//! Connects to a LiveReload server, performs the `hello` handshake and prints
//! every reload and alert it is sent.

pub mod error;
pub mod formatter;
pub mod runner;
pub mod session;

pub use error::ClientError;
pub use runner::run_client;
