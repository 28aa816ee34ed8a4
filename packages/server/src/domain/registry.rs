//! Connection registry trait.
//!
//! The registry is the authoritative set of connections eligible to receive
//! broadcasts. The concrete store lives in the infrastructure layer.

use async_trait::async_trait;

use super::{ConnectionHandle, ConnectionId};

/// Concurrency-safe set of live connections.
///
/// All methods may be called from any task without external locking.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Insert a connection. Called once per connection, when it is created.
    async fn add(&self, handle: ConnectionHandle);

    /// Remove a connection. Idempotent: returns `false` if it was absent.
    async fn remove(&self, id: &ConnectionId) -> bool;

    /// Every currently registered connection.
    ///
    /// A connection registered for the whole duration of the call appears
    /// exactly once. Connections added or removed concurrently may or may not
    /// appear.
    async fn snapshot(&self) -> Vec<ConnectionHandle>;

    /// Number of registered connections.
    async fn count(&self) -> usize;
}
