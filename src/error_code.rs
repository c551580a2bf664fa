//! Normalized provider error codes.
//!
//! Providers report failures with their own `type`/`code` strings. This module maps
//! them, or the HTTP status when the envelope carries nothing recognizable, onto a
//! small fixed set so callers can decide on retries without string matching.
//!
//! ```rust
//! use chatwire::error_code::ApiErrorCode;
//!
//! let code = ApiErrorCode::from_http_status(429);
//! assert_eq!(code.name(), "rate_limited");
//! assert!(code.retryable());
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorCode {
    /// Malformed request, invalid parameters, or missing required fields
    InvalidRequest,
    /// Invalid, expired, or missing API key
    Authentication,
    /// Valid credentials but insufficient permissions
    PermissionDenied,
    /// Model, endpoint, or resource does not exist
    NotFound,
    /// Input exceeds the context window or payload size limit
    RequestTooLarge,
    RateLimited,
    /// Account usage quota or billing limit reached
    QuotaExhausted,
    ServerError,
    Overloaded,
    Timeout,
    Conflict,
    Unknown,
}

impl ApiErrorCode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::RequestTooLarge => "request_too_large",
            Self::RateLimited => "rate_limited",
            Self::QuotaExhausted => "quota_exhausted",
            Self::ServerError => "server_error",
            Self::Overloaded => "overloaded",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a caller-side retry is likely to succeed. The client itself never retries.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError | Self::Overloaded | Self::Timeout | Self::Conflict
        )
    }

    /// Maps a provider `code` or `type` string, including common aliases.
    pub fn from_provider_code(provider_code: &str) -> Option<Self> {
        let code = match provider_code {
            "invalid_request" | "invalid_request_error" | "invalid_value" => Self::InvalidRequest,
            "authentication" | "authentication_error" | "invalid_api_key" => Self::Authentication,
            "permission_denied" | "permission_error" => Self::PermissionDenied,
            "not_found" | "not_found_error" | "model_not_found" => Self::NotFound,
            "request_too_large" | "context_length_exceeded" => Self::RequestTooLarge,
            "rate_limited" | "rate_limit_exceeded" | "rate_limit_error" => Self::RateLimited,
            "quota_exhausted" | "insufficient_quota" => Self::QuotaExhausted,
            "server_error" | "api_error" => Self::ServerError,
            "overloaded" | "overloaded_error" => Self::Overloaded,
            "timeout" => Self::Timeout,
            "conflict" => Self::Conflict,
            _ => return None,
        };
        Some(code)
    }

    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::InvalidRequest,
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            409 => Self::Conflict,
            413 => Self::RequestTooLarge,
            429 => Self::RateLimited,
            503 | 529 => Self::Overloaded,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_aliases() {
        assert_eq!(
            ApiErrorCode::from_provider_code("insufficient_quota"),
            Some(ApiErrorCode::QuotaExhausted)
        );
        assert_eq!(
            ApiErrorCode::from_provider_code("invalid_api_key"),
            Some(ApiErrorCode::Authentication)
        );
        assert_eq!(ApiErrorCode::from_provider_code("something_new"), None);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiErrorCode::from_http_status(400), ApiErrorCode::InvalidRequest);
        assert_eq!(ApiErrorCode::from_http_status(502), ApiErrorCode::ServerError);
        assert_eq!(ApiErrorCode::from_http_status(529), ApiErrorCode::Overloaded);
        assert_eq!(ApiErrorCode::from_http_status(418), ApiErrorCode::Unknown);
    }

    #[test]
    fn test_retryable() {
        assert!(ApiErrorCode::Overloaded.retryable());
        assert!(!ApiErrorCode::Authentication.retryable());
        assert!(!ApiErrorCode::RequestTooLarge.retryable());
    }
}
