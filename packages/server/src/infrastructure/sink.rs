//! Status and error sinks.
//!
//! The server reports broadcast requests and per-connection failures to two
//! injectable sinks. Either may be absent, in which case the report is
//! skipped. Internal diagnostics always go through `tracing` regardless.

use std::{
    io::Write,
    sync::{Mutex, PoisonError},
};

/// Destination for one-line, human-readable server messages.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Which `tracing` level a [`TracingSink`] emits at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkLevel {
    Status,
    Error,
}

/// Default sink: forwards to `tracing` with the server name attached.
#[derive(Debug, Clone)]
pub struct TracingSink {
    server_name: String,
    level: SinkLevel,
}

impl TracingSink {
    pub fn status(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            level: SinkLevel::Status,
        }
    }

    pub fn error(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            level: SinkLevel::Error,
        }
    }

    pub fn level(&self) -> SinkLevel {
        self.level
    }
}

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        match self.level {
            SinkLevel::Status => tracing::info!(server = %self.server_name, "{}", message),
            SinkLevel::Error => tracing::error!(server = %self.server_name, "{}", message),
        }
    }
}

/// Writes `[<name>] <message>` lines to any writer.
pub struct WriterSink<W> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(server_name: &str, writer: W) -> Self {
        Self {
            prefix: format!("[{}] ", server_name),
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn log(&self, message: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // Write errors are ignored.
        let _ = writeln!(writer, "{}{}", self.prefix, message);
    }
}
