//! HTTP utilities for Azure Resource Manager REST calls

use crate::error::ApiError;
use anyhow::{Context, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// `Retry-After` in delta-seconds form; ARM does not send HTTP dates here
fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// HTTP client wrapper for ARM API calls
#[derive(Clone)]
pub struct ArmHttpClient {
    client: Client,
}

impl ArmHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("azinv/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request to an ARM API
    pub async fn get(&self, url: &str, token: &str) -> Result<Value, ApiError> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        let retry_after = parse_retry_after(response.headers().get(RETRY_AFTER));
        let body = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            let sanitized = sanitize_for_log(&body);
            tracing::error!("API error: {} - {}", status, sanitized);
            return Err(ApiError::from_status(status.as_u16(), &sanitized, retry_after));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Format an ARM API error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_arm_error(error: &ApiError) -> String {
    match error {
        ApiError::Throttled { .. } => "Rate limit exceeded. Please try again later.".to_string(),
        ApiError::Server { .. } => {
            "Azure service temporarily unavailable. Please try again.".to_string()
        }
        ApiError::Network(_) => {
            "Request failed. Check your network connection and try again.".to_string()
        }
        ApiError::Client { status: 401, .. } => {
            "Authentication failed. Check your access token.".to_string()
        }
        ApiError::Client { status: 403, .. } => {
            "Permission denied. Check your Azure role assignments.".to_string()
        }
        ApiError::Client { status: 404, code, .. } => format!("Resource not found ({}).", code),
        ApiError::Client { status, code, .. } => format!("Request failed ({} {}).", status, code),
        ApiError::Decode(_) => "Unexpected response from Azure.".to_string(),
        ApiError::InvalidUrl(_) => "Invalid request URL.".to_string(),
        ApiError::Cancelled => "Cancelled.".to_string(),
    }
}
