// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classification for gateway requests.
//!
//! Every failed request is folded into one [`ApiError`] variant so
//! callers branch on a closed set instead of inspecting raw transport
//! errors. Only [`ApiError::Unauthorized`] with `session_expired: false`
//! is ever recovered by the gateway; everything else surfaces unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified outcome of a failed API request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiError {
    /// HTTP 401. `session_expired` marks a 401 the gateway will not
    /// recover: a replay that failed again, or a failed token rotation.
    Unauthorized { session_expired: bool, message: String },
    /// HTTP 403.
    Forbidden { message: String },
    /// HTTP 404.
    NotFound { message: String },
    /// HTTP 429. Backoff is the caller's decision.
    RateLimited { message: String },
    /// HTTP 5xx.
    Server { status: u16, message: String },
    /// The request timed out before any response arrived.
    Timeout,
    /// No response at all (refused connection, DNS failure, broken pipe).
    Network { message: String },
    /// Anything outside the taxonomy: undecodable body, unexpected
    /// status, malformed request descriptor.
    Other { message: String },
}

impl ApiError {
    /// A terminal 401: the session is gone and a new login is required.
    pub fn session_expired() -> Self {
        Self::Unauthorized { session_expired: true, message: "session expired".to_owned() }
    }

    /// True for a first-pass 401 that the gateway may still recover.
    pub fn is_recoverable_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { session_expired: false, .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized { session_expired: true, .. } => "SESSION_EXPIRED",
            Self::Unauthorized { session_expired: false, .. } => "UNAUTHORIZED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Server { .. } => "SERVER_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Network { .. } => "NETWORK_ERROR",
            Self::Other { .. } => "OTHER",
        }
    }
}

/// Classify an HTTP response status the backend actually answered with.
///
/// `message` is the human-readable text pulled from the response
/// envelope (or the raw body when the envelope doesn't parse).
pub fn classify_status(status: u16, message: String) -> ApiError {
    match status {
        401 => ApiError::Unauthorized { session_expired: false, message },
        403 => ApiError::Forbidden { message },
        404 => ApiError::NotFound { message },
        429 => ApiError::RateLimited { message },
        s if s >= 500 => ApiError::Server { status: s, message },
        s => ApiError::Other { message: format!("unexpected status {s}: {message}") },
    }
}

/// Classify a transport-level failure where no usable response exists.
pub fn classify_transport(err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_connect() || err.is_request() {
        ApiError::Network { message: err.to_string() }
    } else if err.is_decode() {
        ApiError::Other { message: format!("undecodable response: {err}") }
    } else {
        ApiError::Other { message: err.to_string() }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized { message, .. }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::RateLimited { message }
            | Self::Network { message }
            | Self::Other { message } => write!(f, "{}: {message}", self.as_str()),
            Self::Server { status, message } => {
                write!(f, "{} ({status}): {message}", self.as_str())
            }
            Self::Timeout => f.write_str(self.as_str()),
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
