//! Per-connection protocol state machine.
//!
//! One [`Connection`] owns one upgraded socket and runs on its own task for
//! the socket's whole lifetime:
//!
//! ```text
//! Connecting -> AwaitingHandshake --hello ok--> Live --error/close--> Closing -> Closed
//!                      \---------- violation / close / timeout ----------^
//! ```
//!
//! The task is the only writer to the socket. Reload and alert requests come
//! in through the connection's mailbox and are written in the order they were
//! enqueued; the mailbox is not read before the handshake is done.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use chrono::Utc;

use crate::{
    domain::{
        CloseReason, Command, ConnectionHandle, ConnectionId, ConnectionMailbox, ConnectionState,
        DecodeError, ProtocolError, PushCommand, negotiate,
    },
    infrastructure::codec::{decode_incoming, encode_alert, encode_hello, encode_reload},
};

use super::state::AppState;

pub struct Connection {
    socket: WebSocket,
    handle: ConnectionHandle,
    mailbox: ConnectionMailbox,
    app: Arc<AppState>,
    state: ConnectionState,
}

impl Connection {
    pub fn new(
        socket: WebSocket,
        handle: ConnectionHandle,
        mailbox: ConnectionMailbox,
        app: Arc<AppState>,
    ) -> Self {
        Self {
            socket,
            handle,
            mailbox,
            app,
            state: ConnectionState::Connecting,
        }
    }

    /// Drive the connection until the socket closes.
    pub async fn run(mut self) {
        self.app.registry.add(self.handle.clone()).await;
        tracing::info!(connection = %self.id(), "Client connected");

        // Shutdown may have taken its close_all snapshot before this add.
        if self.app.is_shutting_down() {
            self.transition(ConnectionState::Closing);
            self.close(CloseReason::ServerShutdown).await;
            return;
        }

        self.transition(ConnectionState::AwaitingHandshake);
        let reason = match self.await_handshake().await {
            Ok(()) => {
                self.transition(ConnectionState::Live);
                self.serve_live().await
            }
            Err(reason) => reason,
        };

        self.transition(ConnectionState::Closing);
        self.close(reason).await;
    }

    fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    fn transition(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(connection = %self.id(), from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    /// Wait for the client `hello` and answer it.
    async fn await_handshake(&mut self) -> Result<(), CloseReason> {
        let deadline = tokio::time::sleep(self.app.handshake_timeout());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                frame = self.socket.recv() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                        Some(Ok(Message::Binary(_))) => {
                            let error = DecodeError::Malformed("binary frame".to_string());
                            return Err(self.reject(error.into()));
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Err(CloseReason::ClientDisconnected);
                        }
                        Some(Err(e)) => {
                            tracing::warn!(connection = %self.id(), "WebSocket error during handshake: {}", e);
                            return Err(CloseReason::TransportError);
                        }
                    };

                    let negotiated = decode_incoming(text.as_str())
                        .map_err(ProtocolError::from)
                        .and_then(|command| negotiate(&command));
                    return match negotiated {
                        Ok(protocol) => self.complete_handshake(protocol).await,
                        Err(error) => Err(self.reject(error)),
                    };
                }
                Some(reason) = self.mailbox.close.recv() => return Err(reason),
                _ = &mut deadline => return Err(self.reject(ProtocolError::HandshakeTimeout)),
            }
        }
    }

    async fn complete_handshake(&mut self, protocol: &str) -> Result<(), CloseReason> {
        // Broadcasts may start enqueueing now; they are only read after the hello below is written.
        self.handle.mark_handshake_complete();

        let hello = encode_hello(&self.app.name());
        if let Err(e) = self.socket.send(Message::Text(hello.into())).await {
            tracing::warn!(connection = %self.id(), "Failed to send hello: {}", e);
            return Err(CloseReason::TransportError);
        }

        tracing::info!(connection = %self.id(), protocol, "Handshake completed");
        Ok(())
    }

    fn reject(&self, error: ProtocolError) -> CloseReason {
        tracing::warn!(connection = %self.id(), "Handshake rejected: {}", error);
        self.app
            .log_error(&format!("connection {} rejected: {}", self.id(), error));
        CloseReason::ProtocolViolation
    }

    /// Forward queued commands until something ends the connection.
    async fn serve_live(&mut self) -> CloseReason {
        loop {
            tokio::select! {
                frame = self.socket.recv() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(reason) = self.handle_client_frame(text.as_str()) {
                            return reason;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return CloseReason::ClientDisconnected,
                    // Pings are answered by the transport.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(connection = %self.id(), "WebSocket error: {}", e);
                        self.app.log_error(&format!("connection {} read failed: {}", self.id(), e));
                        return CloseReason::TransportError;
                    }
                },
                Some(command) = self.mailbox.commands.recv() => {
                    if let Err(reason) = self.push(command).await {
                        return reason;
                    }
                }
                Some(reason) = self.mailbox.close.recv() => return reason,
            }
        }
    }

    /// Client commands after the handshake carry no obligations.
    fn handle_client_frame(&self, text: &str) -> Result<(), CloseReason> {
        match decode_incoming(text) {
            Ok(Command::Info { url }) => {
                tracing::debug!(connection = %self.id(), ?url, "Client info");
            }
            Ok(Command::Url { url }) => {
                tracing::debug!(connection = %self.id(), %url, "Client navigated");
            }
            Ok(command) => {
                tracing::debug!(connection = %self.id(), command = command.name(), "Ignoring client command");
            }
            Err(DecodeError::UnknownCommand(name)) => {
                tracing::debug!(connection = %self.id(), command = %name, "Ignoring unknown command");
            }
            Err(error @ DecodeError::Malformed(_)) => {
                tracing::warn!(connection = %self.id(), "Closing connection: {}", error);
                self.app
                    .log_error(&format!("connection {} closed: {}", self.id(), error));
                return Err(CloseReason::ProtocolViolation);
            }
        }
        Ok(())
    }

    async fn push(&mut self, command: PushCommand) -> Result<(), CloseReason> {
        debug_assert!(self.state.accepts_commands());
        let frame = match &command {
            PushCommand::Reload { path } => encode_reload(path, self.app.live_css()),
            PushCommand::Alert { message } => encode_alert(message),
        };

        match self.socket.send(Message::Text(frame.into())).await {
            Ok(()) => {
                tracing::debug!(connection = %self.id(), ?command, "Command sent");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(connection = %self.id(), "Failed to send command: {}", e);
                self.app
                    .log_error(&format!("connection {} write failed: {}", self.id(), e));
                Err(CloseReason::TransportError)
            }
        }
    }

    /// Leave the registry, drop pending commands and release the socket.
    async fn close(mut self, reason: CloseReason) {
        let id = self.id();

        let dropped = self.mailbox.shutdown();
        self.app.registry.remove(&id).await;

        if reason.should_send_close_frame() {
            let frame = CloseFrame {
                code: reason.code(),
                reason: reason.to_string().into(),
            };
            if let Err(e) = self.socket.send(Message::Close(Some(frame))).await {
                tracing::debug!(connection = %id, "Close frame not delivered: {}", e);
            }
        }

        self.transition(ConnectionState::Closed);
        debug_assert!(self.state.is_terminal());
        let lifetime = Utc::now() - self.handle.connected_at();
        tracing::info!(
            connection = %id,
            %reason,
            dropped,
            lifetime_ms = lifetime.num_milliseconds(),
            "Client disconnected"
        );
    }
}
