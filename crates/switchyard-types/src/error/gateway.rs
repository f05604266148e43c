//! Pipeline errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The failure taxonomy for a completion request or an administrative call.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum GatewayError {
    /// Unknown or inactive API key
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Key is valid but lacks the permission (or model access) required
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Admission denied by a token bucket
    #[error("Rate limited on {subject}, retry after {retry_after_secs:.2}s")]
    RateLimited { subject: String, retry_after_secs: f64 },

    /// Malformed request payload
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Combined message content exceeds the configured maximum
    #[error("Payload too large: {size} chars exceeds limit of {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Provider failure, surfaced verbatim
    #[error("Upstream error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    UpstreamError { status: Option<u16>, message: String },

    /// Key or resource lookup miss
    #[error("Not found: {resource}")]
    NotFound { resource: String },
}

impl GatewayError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::UpstreamError { status, message: message.into() }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Stable machine-readable kind, used in API bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidInput { .. } => "invalid_input",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::UpstreamError { .. } => "upstream_error",
            Self::NotFound { .. } => "not_found",
        }
    }

    /// Get HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::RateLimited { .. } => 429,
            Self::InvalidInput { .. } => 400,
            Self::PayloadTooLarge { .. } => 413,
            Self::UpstreamError { .. } => 502,
            Self::NotFound { .. } => 404,
        }
    }

    /// Retry hint in seconds, only present for rate-limit denials.
    pub fn retry_after_secs(&self) -> Option<f64> {
        match self {
            Self::RateLimited { retry_after_secs, .. } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Check if this is a client error (4xx equivalent).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::UpstreamError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_codes() {
        assert_eq!(GatewayError::unauthorized("nope").http_status_code(), 401);
        assert_eq!(
            GatewayError::PayloadTooLarge { size: 10, limit: 5 }.http_status_code(),
            413
        );
        assert_eq!(GatewayError::upstream(Some(500), "boom").http_status_code(), 502);
    }

    #[test]
    fn test_retry_hint_only_for_rate_limited() {
        let limited = GatewayError::RateLimited { subject: "model:m1".to_string(), retry_after_secs: 2.0 };
        assert_eq!(limited.retry_after_secs(), Some(2.0));
        assert_eq!(GatewayError::forbidden("admin only").retry_after_secs(), None);
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = GatewayError::upstream(Some(503), "overloaded");
        assert_eq!(err.to_string(), "Upstream error (503): overloaded");

        let err = GatewayError::upstream(None, "connection reset");
        assert_eq!(err.to_string(), "Upstream error: connection reset");
        assert!(!err.is_client_error());
    }
}
