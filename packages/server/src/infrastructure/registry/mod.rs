//! Connection registry implementations.
//!
//! - `inmemory`: HashMap behind a tokio Mutex

pub mod inmemory;

pub use inmemory::InMemoryConnectionRegistry;
