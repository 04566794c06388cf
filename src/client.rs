//! ==============================================================================
//! client.rs - device-side uploader
//! ==============================================================================
//!
//! purpose:
//!     what a sensor node runs to push readings to the relay.
//!     - RelayClient: typed wrapper over the three endpoints
//!     - UploadQueue: bounded backlog that survives a flaky uplink
//!
//! backlog policy:
//!     at most 50 pending readings; on overflow the oldest is dropped.
//!     the head is removed only after the relay acknowledges it. each
//!     consecutive failure doubles the retry delay, capped at 60s.
//!
//! ==============================================================================

use crate::domain::{HealthResponse, Reading, StoredReading};
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

pub const QUEUE_CAPACITY: usize = 50;
const MAX_BACKOFF_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay rejected the ingest token")]
    Unauthorized,

    #[error("unexpected status {0}")]
    Status(u16),
}

// ==============================================================================
// relay client
// ==============================================================================

#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /ingest with the bearer token
    pub async fn ingest(&self, reading: &Reading) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/ingest"))
            .bearer_auth(&self.token)
            .json(reading)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
            s => Err(ClientError::Status(s.as_u16())),
        }
    }

    /// GET /latest; None while the relay has nothing yet
    pub async fn latest(&self) -> Result<Option<StoredReading>, ClientError> {
        let response = self.http.get(self.url("/latest")).send().await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(None),
            StatusCode::OK => Ok(Some(response.json().await?)),
            s => Err(ClientError::Status(s.as_u16())),
        }
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.url("/health")).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

// ==============================================================================
// upload queue
// ==============================================================================

#[derive(Debug, Default)]
pub struct UploadQueue {
    pending: VecDeque<Reading>,
    retries: u32,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// queue a reading, evicting the oldest when full
    ///
    /// returns the evicted reading, if any.
    pub fn push(&mut self, reading: Reading) -> Option<Reading> {
        self.pending.push_back(reading);
        if self.pending.len() > QUEUE_CAPACITY {
            self.pending.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// how long to wait before the next attempt
    pub fn backoff(&self) -> Duration {
        if self.retries == 0 {
            return Duration::ZERO;
        }
        let secs = 1u64
            .checked_shl(self.retries)
            .unwrap_or(u64::MAX)
            .min(MAX_BACKOFF_SECS);
        Duration::from_secs(secs)
    }

    /// send the oldest pending reading
    ///
    /// Ok(false) when there was nothing to send.
    pub async fn flush_one(&mut self, client: &RelayClient) -> Result<bool, ClientError> {
        let Some(head) = self.pending.front() else {
            return Ok(false);
        };

        match client.ingest(head).await {
            Ok(()) => {
                self.pending.pop_front();
                self.retries = 0;
                Ok(true)
            }
            Err(e) => {
                self.retries = self.retries.saturating_add(1);
                tracing::warn!(retries = self.retries, error = %e, "upload failed");
                Err(e)
            }
        }
    }
}

// ==============================================================================
// tests
// ==============================================================================
// network paths are covered against a live relay in tests/relay_http.rs.
