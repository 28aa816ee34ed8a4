//! Error types for the server facade and the operator console.

use thiserror::Error;

/// Failures surfaced to whoever starts the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Console input that could not be understood.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("'{0}' needs an argument (try 'help')")]
    MissingArgument(&'static str),

    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),
}
