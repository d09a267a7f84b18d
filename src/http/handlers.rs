//! Axum HTTP handlers for the web server

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Protocol errors are answered with 200 like any other response; 204 means
/// every call in the payload was a notification.
pub async fn rpc_endpoint(State(state): State<AppState>, body: Bytes) -> Response {
    let dispatcher = Arc::clone(&state.dispatcher);
    let reply = tokio::task::spawn_blocking(move || dispatcher.handle_payload(&body)).await;

    match reply {
        Ok(Some(json)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!(error = %err, "rpc dispatch task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
