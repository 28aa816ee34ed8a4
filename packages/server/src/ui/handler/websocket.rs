//! WebSocket upgrade handler.

use std::sync::Arc;

use axum::{
    extract::{State, ws::WebSocketUpgrade},
    response::IntoResponse,
};

use crate::{
    domain::ConnectionHandle,
    ui::{connection::Connection, state::AppState},
};

/// Upgrade `/livereload` requests and hand the socket to its own connection task.
///
/// The connection is registered only once the upgrade has succeeded, so a
/// failed upgrade leaves nothing behind.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let failure_state = state.clone();
    ws.on_failed_upgrade(move |e| {
        tracing::warn!("WebSocket upgrade failed: {}", e);
        failure_state.log_error(&format!("upgrade failed: {}", e));
    })
    .on_upgrade(move |socket| async move {
        let (handle, mailbox) = ConnectionHandle::new();
        Connection::new(socket, handle, mailbox, state).run().await;
    })
}
