//! ==============================================================================
//! server.rs - route table and listener
//! ==============================================================================
//!
//! purpose:
//!     wires the handlers into an axum router and runs it.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  TimeoutLayer  ->  CorsLayer (GET, any origin)       │
//! │    ├── POST /ingest  ── require_bearer ── ingest     │
//! │    ├── GET  /latest  ───────────────────── latest    │
//! │    └── GET  /health  ───────────────────── health    │
//! │                         │                            │
//! │                   AppState (store + gate)            │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ==============================================================================

use crate::api::{self, AppState};
use crate::auth::require_bearer;
use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

/// build the full router for the relay
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let ingest = post(api::ingest).route_layer(middleware::from_fn_with_state(
        state.gate.clone(),
        require_bearer,
    ));

    // browsers may read; writes come from the device, not a page
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/ingest", ingest)
        .route("/latest", get(api::latest))
        .route("/health", get(api::health))
        .layer(cors)
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// serve until `shutdown` resolves
///
/// peer addresses are recorded so /ingest can stamp source_ip.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
