//! Cloud API error classification
//!
//! Every ARM call outcome that is not a success maps to an [`ApiError`].
//! The retry executor only cares about one bit of it: transient or not.

use std::time::Duration;
use thiserror::Error;

/// Error returned by a single cloud management API call
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 429, the service asked us to slow down
    #[error("throttled ({status}): {message}")]
    Throttled {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    /// HTTP 5xx
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Connection, timeout or other transport failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-success status (not found, forbidden, bad request...)
    #[error("request failed ({status} {code}): {message}")]
    Client {
        status: u16,
        code: String,
        message: String,
    },

    /// Response body was not the JSON we expected
    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// Request URL could not be built
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The query was cancelled before the call could complete
    #[error("operation cancelled")]
    Cancelled,
}

impl ApiError {
    /// Whether the call may succeed if simply tried again later.
    ///
    /// A request reqwest could not even build (bad URL, bad header) fails the
    /// same way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Throttled { .. } | ApiError::Server { .. } => true,
            ApiError::Network(e) => !e.is_builder(),
            _ => false,
        }
    }

    /// Server-provided hint for how long to wait before retrying
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::Throttled { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status, when the error came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Throttled { status, .. }
            | ApiError::Server { status, .. }
            | ApiError::Client { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::InvalidUrl(_) | ApiError::Cancelled => None,
        }
    }

    /// Build an error from a non-success status and its (already sanitized) body
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let (code, message) = parse_arm_error(body);
        match status {
            429 => ApiError::Throttled {
                status,
                message,
                retry_after,
            },
            500..=599 => ApiError::Server { status, message },
            _ => ApiError::Client {
                status,
                code,
                message,
            },
        }
    }
}

/// Pull `error.code` / `error.message` out of an ARM error envelope
fn parse_arm_error(body: &str) -> (String, String) {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    let code = error
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string();
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| body.to_string());

    (code, message)
}
