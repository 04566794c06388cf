//! ==============================================================================
//! lib.rs - altimeter relay library root
//! ==============================================================================
//!
//! purpose:
//!     one device pushes altitude/pressure readings over http, any number of
//!     readers poll for the most recent one. the server keeps a single slot,
//!     nothing more: no history, no persistence.
//!
//! relationships:
//!     - used by: main.rs (process bootstrap)
//!     - used by: tests/relay_http.rs (drives a live server)
//!
//! ==============================================================================

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod store;

pub use api::AppState;
pub use auth::{AuthGate, IngestToken};
pub use domain::{HealthResponse, Reading, StoreStatus, StoredReading};
pub use store::{LatestReadingStore, ReadingStore};
