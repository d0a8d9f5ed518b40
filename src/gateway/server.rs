//! WebSocket upgrade handlers: route matching, identity resolution, and
//! handoff to the session handlers.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocket;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::auth;
use crate::AppState;

use super::personal;
use super::room;
use super::session;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(personal_upgrade))
        .route("/chat/{room_id}", get(room_upgrade))
        .route("/healthz", get(healthz))
        .fallback(unmatched_route)
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Root path: personal session. Identity is resolved here; anonymous
/// connections are rejected by the session at connect, not by the gateway.
async fn personal_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let identity = auth::identify(state.auth.as_ref(), &headers).await;
    ws.on_upgrade(move |socket| personal::run(socket, state, identity))
}

/// `chat/{room_id}` path: room session. A room id that does not parse as
/// the store's identifier format fails the route before any handler runs.
async fn room_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let Ok(room_id) = Uuid::parse_str(&room_id) else {
        tracing::debug!(%room_id, "rejecting non-uuid room route");
        return ws.on_upgrade(close_immediately);
    };

    let identity = auth::identify(state.auth.as_ref(), &headers).await;
    ws.on_upgrade(move |socket| room::run(socket, state, identity, room_id))
}

/// Unmatched paths close the connection with the fixed code, before any
/// handler is invoked. Plain HTTP requests get a 404.
async fn unmatched_route(ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>) -> Response {
    match ws {
        Ok(ws) => ws.on_upgrade(close_immediately),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn close_immediately(socket: WebSocket) {
    let (mut ws_tx, _ws_rx) = socket.split();
    let _ = session::send_close(&mut ws_tx, "Invalid route").await;
}
