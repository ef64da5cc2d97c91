//! Error taxonomy for the scan pipeline
//!
//! Every failure reaching the retry driver, the worker, or the logs is a
//! [`ScanError`]: a platform tag plus a classified kind. The kind decides
//! retryability and the backoff the server effectively asked for.

use crate::platform::Platform;
use std::time::Duration;
use thiserror::Error;

/// Classified failure kinds.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    #[error("http status {code}: {body}")]
    HttpStatus { code: u16, body: String },

    #[error("rate limited (retry after {retry_after_secs:?} s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("schema validation failed: {detail}")]
    Validation {
        detail: String,
        /// The offending payload, kept for diagnosis
        payload: serde_json::Value,
    },

    #[error("missing configuration: {0}")]
    ConfigMissing(String),

    #[error("{0}")]
    Unknown(String),
}

/// A failure attributed to one platform's pipeline.
#[derive(Debug, Error)]
#[error("{platform}: {kind}")]
pub struct ScanError {
    pub platform: Platform,
    pub kind: ErrorKind,
}

/// Result type alias for scanner operations
pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    pub fn timeout(platform: Platform, msg: impl Into<String>) -> Self {
        Self {
            platform,
            kind: ErrorKind::NetworkTimeout(msg.into()),
        }
    }

    pub fn http_status(platform: Platform, code: u16, body: impl Into<String>) -> Self {
        Self {
            platform,
            kind: ErrorKind::HttpStatus {
                code,
                body: body.into(),
            },
        }
    }

    pub fn rate_limited(platform: Platform, retry_after_secs: Option<u64>) -> Self {
        Self {
            platform,
            kind: ErrorKind::RateLimited { retry_after_secs },
        }
    }

    pub fn validation(
        platform: Platform,
        detail: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            platform,
            kind: ErrorKind::Validation {
                detail: detail.into(),
                payload,
            },
        }
    }

    pub fn config_missing(platform: Platform, what: impl Into<String>) -> Self {
        Self {
            platform,
            kind: ErrorKind::ConfigMissing(what.into()),
        }
    }

    pub fn unknown(platform: Platform, msg: impl Into<String>) -> Self {
        Self {
            platform,
            kind: ErrorKind::Unknown(msg.into()),
        }
    }

    /// Map a transport error into the taxonomy.
    ///
    /// Status-code classification happens in [`ScanError::from_status`]
    /// because `reqwest` surfaces non-2xx responses as successful sends.
    pub fn classify(err: reqwest::Error, platform: Platform) -> Self {
        if err.is_timeout() {
            return Self::timeout(platform, err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::from_status(platform, status.as_u16(), err.to_string(), None);
        }
        Self::unknown(platform, err.to_string())
    }

    /// Classify an HTTP response status, with the `Retry-After` value (in
    /// seconds) when the server supplied one.
    pub fn from_status(
        platform: Platform,
        code: u16,
        body: impl Into<String>,
        retry_after_secs: Option<u64>,
    ) -> Self {
        if code == 429 {
            Self::rate_limited(platform, retry_after_secs)
        } else {
            Self::http_status(platform, code, body)
        }
    }

    /// Whether retrying this error could plausibly succeed.
    pub fn retryable(&self) -> bool {
        match &self.kind {
            ErrorKind::NetworkTimeout(_) => true,
            ErrorKind::HttpStatus { code, .. } => *code >= 500,
            ErrorKind::RateLimited { .. } => true,
            _ => false,
        }
    }

    /// The backoff this error suggests, when it carries one.
    ///
    /// Rate limits honour the server's `Retry-After` (60 s when absent);
    /// server errors and timeouts carry fixed advisory delays.
    pub fn suggested_delay(&self) -> Option<Duration> {
        match &self.kind {
            ErrorKind::RateLimited { retry_after_secs } => {
                Some(Duration::from_secs(retry_after_secs.unwrap_or(60)))
            }
            ErrorKind::HttpStatus { code, .. } if *code >= 500 => {
                Some(Duration::from_millis(5000))
            }
            ErrorKind::NetworkTimeout(_) => Some(Duration::from_millis(2000)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let platform = Platform::Kalshi;
        assert!(ScanError::timeout(platform, "t").retryable());
        assert!(ScanError::http_status(platform, 500, "").retryable());
        assert!(ScanError::http_status(platform, 503, "").retryable());
        assert!(ScanError::rate_limited(platform, Some(2)).retryable());

        assert!(!ScanError::http_status(platform, 400, "").retryable());
        assert!(!ScanError::http_status(platform, 404, "").retryable());
        assert!(!ScanError::validation(platform, "bad", serde_json::json!({})).retryable());
        assert!(!ScanError::config_missing(platform, "url").retryable());
        assert!(!ScanError::unknown(platform, "?").retryable());
    }

    #[test]
    fn test_suggested_delays() {
        let platform = Platform::Polymarket;
        assert_eq!(
            ScanError::rate_limited(platform, Some(2)).suggested_delay(),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            ScanError::rate_limited(platform, None).suggested_delay(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            ScanError::http_status(platform, 502, "").suggested_delay(),
            Some(Duration::from_millis(5000))
        );
        assert_eq!(
            ScanError::timeout(platform, "t").suggested_delay(),
            Some(Duration::from_millis(2000))
        );
        assert_eq!(ScanError::http_status(platform, 404, "").suggested_delay(), None);
    }

    #[test]
    fn test_from_status_maps_429() {
        let err = ScanError::from_status(Platform::Manifold, 429, "slow down", Some(7));
        assert!(matches!(
            err.kind,
            ErrorKind::RateLimited {
                retry_after_secs: Some(7)
            }
        ));

        let err = ScanError::from_status(Platform::Manifold, 502, "bad gateway", None);
        assert!(matches!(err.kind, ErrorKind::HttpStatus { code: 502, .. }));
    }

    #[test]
    fn test_validation_keeps_payload() {
        let payload = serde_json::json!({"outcomes": "not-an-array"});
        let err = ScanError::validation(Platform::Polymarket, "bad outcomes", payload.clone());
        match err.kind {
            ErrorKind::Validation { payload: kept, .. } => assert_eq!(kept, payload),
            _ => panic!("expected validation kind"),
        }
    }
}
