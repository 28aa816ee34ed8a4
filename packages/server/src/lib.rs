//! LiveReload protocol server.
//!
//! Browsers running a LiveReload client connect over WebSocket, complete the
//! `hello` handshake, and are then told to reload files or show alerts
//! whenever [`Server::reload`] or [`Server::alert`] is called.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub use ui::{DEFAULT_HOST, DEFAULT_NAME, DEFAULT_PORT, Server, ServerError};
