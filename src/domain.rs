//! ==============================================================================
//! domain.rs - wire types for the relay
//! ==============================================================================
//!
//! purpose:
//!     the reading a device pushes, the stamped copy the server keeps,
//!     and the small status shapes the read paths return.
//!
//! relationships:
//!     - used by: store.rs (holds a StoredReading)
//!     - used by: api.rs (request/response bodies)
//!     - used by: client.rs (the uploader sends/receives the same shapes)
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// a single altimeter sample as sent by the device
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Reading {
    /// opaque sender identifier
    pub device_id: String,

    /// device-side capture time (epoch ms), not checked against the server clock
    pub timestamp_ms: i64,

    /// altitude relative to the session start, in metres
    pub relative_altitude_m: f64,

    /// barometric pressure in kPa
    pub pressure_kpa: f64,

    /// cumulative climb in metres
    pub vertical_gain_m: f64,

    /// net altitude change in metres
    pub net_change_m: f64,

    /// device sequence number, stored as-is
    pub seq: i64,

    /// battery level 0.0-1.0, when the device reports it
    #[serde(default)]
    pub battery_level: Option<f64>,

    #[serde(default)]
    pub is_charging: Option<bool>,

    #[serde(default)]
    pub app_version: Option<String>,
}

/// a reading plus the receipt metadata the server attaches
///
/// serializes flat: every reading field sits next to
/// `received_at_ms` and `source_ip` in one json object.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct StoredReading {
    #[serde(flatten)]
    pub reading: Reading,

    /// server wall-clock time of acceptance (epoch ms)
    pub received_at_ms: u64,

    /// peer address the reading arrived from
    pub source_ip: Option<String>,
}

impl StoredReading {
    pub fn new(reading: Reading, received_at_ms: u64, source_ip: Option<String>) -> Self {
        Self {
            reading,
            received_at_ms,
            source_ip,
        }
    }
}

/// derived summary of the store, never mutates it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStatus {
    pub has_data: bool,
    pub last_received_at_ms: Option<u64>,
}

/// body of GET /health
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub ok: bool,
    pub has_data: bool,
    pub last_received_at_ms: Option<u64>,
}

impl From<StoreStatus> for HealthResponse {
    fn from(status: StoreStatus) -> Self {
        Self {
            ok: true,
            has_data: status.has_data,
            last_received_at_ms: status.last_received_at_ms,
        }
    }
}

/// body of a successful POST /ingest
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub struct IngestAck {
    pub ok: bool,
}

impl IngestAck {
    pub const OK: IngestAck = IngestAck { ok: true };
}

/// current unix time in milliseconds
pub fn epoch_ms() -> u64 {
    millis_since_epoch(SystemTime::now())
}

/// a clock set before 1970 has no u64 representation; it stamps 0
fn millis_since_epoch(now: SystemTime) -> u64 {
    match now.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as u64,
        Err(e) => {
            warn!(
                behind_ms = e.duration().as_millis() as u64,
                "system clock is before the unix epoch"
            );
            0
        }
    }
}
