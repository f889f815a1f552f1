//! Read-only HTTP interface over the latest decoded state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use log::info;

use crate::decoder::CancellationToken;
use crate::schema::PacketType;
use crate::state::StateSnapshot;

/// Build the status router: `GET /aimms` for the whole snapshot, and
/// `GET /aimms/:kind` for the latest packet of one type.
pub fn router(state: Arc<StateSnapshot>) -> Router {
    Router::new()
        .route("/aimms", get(full_state))
        .route("/aimms/:kind", get(packet_by_kind))
        .with_state(state)
}

async fn full_state(State(state): State<Arc<StateSnapshot>>) -> Json<serde_json::Value> {
    Json(state.to_json())
}

async fn packet_by_kind(
    Path(kind): Path<String>,
    State(state): State<Arc<StateSnapshot>>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let packet_type = PacketType::from_tag(&kind).ok_or(StatusCode::NOT_FOUND)?;
    let packet = state.get(packet_type).ok_or(StatusCode::NOT_FOUND)?;
    serde_json::to_value(&packet)
        .map(Json)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serve the router on `addr` until the token is cancelled.
///
/// Handlers only ever read snapshots of downstream state; the byte buffer
/// and the packet queue are out of reach by construction.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<StateSnapshot>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("status server listening on http://{addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            while !cancel.is_cancelled() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await
}
