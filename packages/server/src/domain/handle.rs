//! The handle through which the rest of the server talks to one connection.
//!
//! A [`ConnectionHandle`] is the producer side of a connection's mailbox and
//! close signal. The connection's own task owns the matching
//! [`ConnectionMailbox`] and is the single consumer, so commands enqueued on
//! one handle are written to the socket in enqueue order.
//!
//! The mailbox is bounded. An enqueue waits for room for at most a deadline
//! and gives up as soon as the connection closes its mailbox, so a stalled or
//! dead client can neither hang a broadcast nor accumulate unbounded state.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::SendTimeoutError};

use super::{CloseReason, ConnectionId, EnqueueError, PushCommand};

/// Commands buffered per connection before enqueuers have to wait.
pub const COMMAND_QUEUE_CAPACITY: usize = 8;

/// How long a broadcast waits for room in one connection's mailbox.
pub const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(1);

/// Producer side of a connection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    connected_at: DateTime<Utc>,
    handshake_complete: Arc<AtomicBool>,
    commands: mpsc::Sender<PushCommand>,
    close: mpsc::Sender<CloseReason>,
}

/// Consumer side of a connection, owned by the connection task.
#[derive(Debug)]
pub struct ConnectionMailbox {
    /// Reload and alert requests, in enqueue order.
    pub commands: mpsc::Receiver<PushCommand>,
    /// Close requests from the server.
    pub close: mpsc::Receiver<CloseReason>,
}

impl ConnectionHandle {
    /// Create a handle for a new connection together with its mailbox.
    pub fn new() -> (Self, ConnectionMailbox) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (close_tx, close_rx) = mpsc::channel(1);

        let handle = Self {
            id: ConnectionId::generate(),
            connected_at: Utc::now(),
            handshake_complete: Arc::new(AtomicBool::new(false)),
            commands: commands_tx,
            close: close_tx,
        };
        let mailbox = ConnectionMailbox {
            commands: commands_rx,
            close: close_rx,
        };

        (handle, mailbox)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn is_handshake_complete(&self) -> bool {
        self.handshake_complete.load(Ordering::Acquire)
    }

    /// Mark the handshake as done. Only the connection task calls this.
    pub fn mark_handshake_complete(&self) {
        self.handshake_complete.store(true, Ordering::Release);
    }

    /// Whether the connection has stopped consuming its mailbox.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Enqueue a command using [`ENQUEUE_TIMEOUT`].
    pub async fn enqueue(&self, command: PushCommand) -> Result<(), EnqueueError> {
        self.enqueue_with_timeout(command, ENQUEUE_TIMEOUT).await
    }

    /// Enqueue a command, waiting at most `timeout` for room in the mailbox.
    ///
    /// Returns [`EnqueueError::Closed`] as soon as the connection closes, even
    /// while waiting for room.
    pub async fn enqueue_with_timeout(
        &self,
        command: PushCommand,
        timeout: Duration,
    ) -> Result<(), EnqueueError> {
        tokio::select! {
            result = self.commands.send_timeout(command, timeout) => match result {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Closed(_)) => Err(EnqueueError::Closed),
                Err(SendTimeoutError::Timeout(_)) => Err(EnqueueError::TimedOut),
            },
            _ = self.close.closed() => Err(EnqueueError::Closed),
        }
    }

    /// Ask the connection to close. Returns `false` if it is already closing.
    pub fn close(&self, reason: CloseReason) -> bool {
        self.close.try_send(reason).is_ok()
    }
}

impl ConnectionMailbox {
    /// Stop accepting commands and discard whatever is still queued.
    ///
    /// Wakes every enqueuer still waiting for room. Returns the number of
    /// discarded commands.
    pub fn shutdown(&mut self) -> usize {
        self.commands.close();
        self.close.close();

        let mut dropped = 0;
        while self.commands.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
