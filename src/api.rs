//! ==============================================================================
//! api.rs - http handlers
//! ==============================================================================
//!
//! purpose:
//!     the thin layer between axum and the store.
//!
//! ```text
//! POST /ingest   (gated by auth.rs) parse, stamp, replace the slot
//! GET  /latest   current reading with no-cache headers, or 204
//! GET  /health   has_data / last_received_at_ms summary, always 200
//! ```
//!
//! relationships:
//!     - used by: server.rs (route table)
//!     - uses: store.rs through AppState, domain.rs for bodies
//!
//! ==============================================================================

use crate::auth::AuthGate;
use crate::domain::{epoch_ms, HealthResponse, IngestAck, Reading};
use crate::error::{ApiError, ApiResult};
use crate::store::ReadingStore;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

// ==============================================================================
// shared state
// ==============================================================================
// one store per process, injected here rather than held in a global.
// handlers only ever go through the ReadingStore operations.

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReadingStore>,
    pub gate: AuthGate,
}

impl AppState {
    pub fn new(store: Arc<dyn ReadingStore>, gate: AuthGate) -> Self {
        Self { store, gate }
    }
}

// ==============================================================================
// handlers
// ==============================================================================

/// accept a reading from the device
///
/// auth already ran in middleware; here only the body can fail.
pub async fn ingest(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<Reading>, JsonRejection>,
) -> ApiResult<Json<IngestAck>> {
    let Json(reading) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;

    let source_ip = peer.map(|ConnectInfo(addr)| addr.ip().to_string());
    debug!(
        device_id = %reading.device_id,
        seq = reading.seq,
        source_ip = source_ip.as_deref().unwrap_or("-"),
        "reading accepted"
    );

    state.store.write(reading, epoch_ms(), source_ip);
    Ok(Json(IngestAck::OK))
}

/// most recent reading, or 204 before the first write
pub async fn latest(State(state): State<AppState>) -> Response {
    match state.store.read_latest() {
        Some(stored) => (
            [
                (header::CACHE_CONTROL, NO_CACHE),
                (header::PRAGMA, "no-cache"),
                (header::EXPIRES, "0"),
            ],
            Json(stored.as_ref()),
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(state.store.status().into())
}

// ==============================================================================
// tests
// ==============================================================================
// handlers are called directly here; the full http stack (middleware,
// headers on the wire, peer address) is covered in tests/relay_http.rs.
