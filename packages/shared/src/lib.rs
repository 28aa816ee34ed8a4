//! Utilities shared by the LiveReload server and client binaries.

pub mod logger;
