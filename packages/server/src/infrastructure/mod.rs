//! Infrastructure layer: wire format, registry storage and log sinks.

pub mod codec;
pub mod dto;
pub mod registry;
pub mod sink;

pub use registry::InMemoryConnectionRegistry;
pub use sink::{LogSink, TracingSink, WriterSink};
