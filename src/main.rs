//! ==============================================================================
//! main.rs - altimeter relay entry point
//! ==============================================================================
//!
//! purpose:
//!     boots the relay: config, logging, shared store, http server.
//!
//! startup order:
//!     1. load relay.toml (if any) and apply environment overrides
//!     2. refuse to start without INGEST_TOKEN
//!     3. initialize tracing
//!     4. build the store and router, bind, serve until ctrl-c
//!
//! ==============================================================================

use altimeter_relay::config::RelayConfig;
use altimeter_relay::{server, AppState, AuthGate, LatestReadingStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  Altimeter Relay");
    println!("  \"One slot, latest wins\"");
    println!("===========================================================");

    // step 1: load configuration
    let mut config = RelayConfig::load_or_default()?;
    config.apply_env()?;
    config.print_summary();

    // step 2: the write secret is mandatory
    let token = config.ingest_token()?;

    // step 3: logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // step 4: shared state and router
    let state = AppState::new(Arc::new(LatestReadingStore::new()), AuthGate::new(token));
    let router = server::build_router(state, config.request_timeout());

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server starting on {}", addr);
    info!("Ingest endpoint secured with token authentication");

    server::serve(listener, router, shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
