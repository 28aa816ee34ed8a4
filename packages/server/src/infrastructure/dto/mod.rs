//! Data Transfer Objects (DTOs) for the LiveReload protocol.
//!
//! - `websocket`: JSON frames exchanged over the `/livereload` socket

pub mod websocket;
