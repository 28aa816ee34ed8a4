//! In-memory connection registry.
//!
//! Implements the domain's `ConnectionRegistry` trait with a `HashMap`
//! guarded by a tokio `Mutex`. The lock is only held for the map operation
//! itself, never while a command is being enqueued.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionHandle, ConnectionId, ConnectionRegistry};

/// In-memory `ConnectionRegistry`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnectionRegistry {
    /// Key: connection id, Value: producer handle of that connection
    connections: Arc<Mutex<HashMap<ConnectionId, ConnectionHandle>>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn add(&self, handle: ConnectionHandle) {
        let mut connections = self.connections.lock().await;
        let id = handle.id();
        connections.insert(id, handle);
        tracing::debug!(connection = %id, total = connections.len(), "Connection registered");
    }

    async fn remove(&self, id: &ConnectionId) -> bool {
        let mut connections = self.connections.lock().await;
        let removed = connections.remove(id).is_some();
        if removed {
            tracing::debug!(connection = %id, total = connections.len(), "Connection unregistered");
        }
        removed
    }

    async fn snapshot(&self) -> Vec<ConnectionHandle> {
        let connections = self.connections.lock().await;
        connections.values().cloned().collect()
    }

    async fn count(&self) -> usize {
        self.connections.lock().await.len()
    }
}
