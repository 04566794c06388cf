//! ==============================================================================
//! auth.rs - bearer gate for the write path
//! ==============================================================================
//!
//! purpose:
//!     decides whether a POST /ingest may touch the store. only the write
//!     route is gated; /latest and /health are public.
//!
//! policy:
//!     authorized iff the Authorization header is present, starts with the
//!     exact prefix "Bearer " (case-sensitive, one space) and the rest equals
//!     the configured secret byte for byte. no trimming.
//!
//! ordering:
//!     the middleware runs before the handler's body extractor, so an
//!     unauthenticated request gets 401 even when its body is also invalid.
//!
//! ==============================================================================

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

const SCHEME_PREFIX: &str = "Bearer ";

/// the server-held write secret, never empty
#[derive(Clone, PartialEq, Eq)]
pub struct IngestToken(Arc<str>);

impl IngestToken {
    /// None for an empty secret, which would otherwise match "Bearer "
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            None
        } else {
            Some(Self(secret.into()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IngestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IngestToken(<redacted>)")
    }
}

/// why a credential was refused; only ever logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Missing,
    BadScheme,
    WrongToken,
}

#[derive(Clone, Debug)]
pub struct AuthGate {
    token: IngestToken,
}

impl AuthGate {
    pub fn new(token: IngestToken) -> Self {
        Self { token }
    }

    /// check a raw Authorization header value
    pub fn check(&self, header: Option<&str>) -> Result<(), Rejection> {
        let header = header.ok_or(Rejection::Missing)?;
        let presented = header
            .strip_prefix(SCHEME_PREFIX)
            .ok_or(Rejection::BadScheme)?;

        let matches: bool = self
            .token
            .as_str()
            .as_bytes()
            .ct_eq(presented.as_bytes())
            .into();
        if matches {
            Ok(())
        } else {
            Err(Rejection::WrongToken)
        }
    }

    pub fn authorize(&self, header: Option<&str>) -> bool {
        self.check(header).is_ok()
    }
}

/// axum middleware guarding the write route
pub async fn require_bearer(
    State(gate): State<AuthGate>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // a non-ascii header value counts as malformed, not missing
    let credential = req
        .headers()
        .get(header::AUTHORIZATION)
        .map(|h| h.to_str().unwrap_or_default());

    match gate.check(credential) {
        Ok(()) => Ok(next.run(req).await),
        Err(reason) => {
            warn!(?reason, path = %req.uri().path(), "rejected write");
            Err(ApiError::Unauthorized)
        }
    }
}
