//! HTTP endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::ui::state::AppState;

/// Serve the configured browser client script.
pub async fn client_script(State(state): State<Arc<AppState>>) -> Response {
    match state.client_script() {
        Some(script) => (
            [(header::CONTENT_TYPE, "application/javascript")],
            script.to_string(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "no client script configured").into_response(),
    }
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let connections = state.registry.count().await;
    Json(serde_json::json!({"status": "ok", "connections": connections}))
}
