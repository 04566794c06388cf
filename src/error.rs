//! ==============================================================================
//! error.rs - error taxonomy
//! ==============================================================================
//!
//! purpose:
//!     request errors are turned into a status code and a `{"detail": ...}`
//!     body at the handler boundary. an empty store is not an error; /latest
//!     answers 204 for that case. config errors are fatal at startup.
//!
//! relationships:
//!     - used by: auth.rs (Unauthorized), api.rs (Validation)
//!     - used by: config.rs, main.rs (ConfigError)
//!
//! ==============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// missing, malformed or mismatched bearer credential
    #[error("Unauthorized")]
    Unauthorized,

    /// the ingest body does not match the reading schema
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// startup configuration failures, all fatal
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),

    #[error("INGEST_TOKEN environment variable is required")]
    MissingIngestToken,
}
