//! Typed failures surfaced by catalog sources.
//!
//! Every provider-specific failure is translated into this one taxonomy at
//! the adapter boundary, so the orchestrator and callers reason about a
//! single set of conditions regardless of which upstream misbehaved.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::catalog::Provider;

/// Failure conditions for a model discovery call.
///
/// `RateLimited` and `Transport` are transient and retryable with backoff;
/// `Authentication` and `MalformedResponse` are not; retrying a rejected
/// credential or an upstream contract violation cannot succeed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiscoveryError {
    /// The credential was rejected (401/403-equivalent). Never retried,
    /// never cached as a model list.
    #[error("{provider} rejected the credential: {message}")]
    Authentication { provider: Provider, message: String },

    /// The provider throttled the request, optionally hinting how long to
    /// wait before trying again.
    #[error("{provider} throttled the request: {message}")]
    RateLimited {
        provider: Provider,
        retry_after: Option<Duration>,
        message: String,
    },

    /// Connectivity or timeout failure before a usable response arrived.
    #[error("could not reach {provider}: {message}")]
    Transport { provider: Provider, message: String },

    /// The response arrived but could not be parsed into the expected shape.
    #[error("{provider} returned an unparseable catalog response: {message}")]
    MalformedResponse { provider: Provider, message: String },

    /// The requested model has no record in the current catalog. Returned to
    /// callers of capability lookups; not a system failure.
    #[error("model '{model_id}' is not in the known catalog for {provider}")]
    NotFound { provider: Provider, model_id: String },
}

impl DiscoveryError {
    /// The provider the failure originated from.
    pub fn provider(&self) -> Provider {
        match self {
            Self::Authentication { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Transport { provider, .. }
            | Self::MalformedResponse { provider, .. }
            | Self::NotFound { provider, .. } => *provider,
        }
    }

    /// Whether retrying with backoff can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transport { .. })
    }

    /// The provider's retry-after hint, if it sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Classify a transport-level `reqwest` failure.
    pub(crate) fn from_reqwest(provider: Provider, err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse {
                provider,
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                provider,
                message: err.to_string(),
            }
        }
    }

    /// Classify a non-success HTTP status.
    ///
    /// Unexpected 4xx statuses on a catalog call mean the provider no longer
    /// honors the contract we coded against, so they map to
    /// `MalformedResponse` rather than a transient condition.
    pub(crate) fn from_status(
        provider: Provider,
        status: StatusCode,
        retry_after: Option<Duration>,
        message: String,
    ) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Authentication { provider, message },
            429 => Self::RateLimited {
                provider,
                retry_after,
                message,
            },
            500..=599 => Self::Transport {
                provider,
                message: format!("HTTP {status}: {message}"),
            },
            _ => Self::MalformedResponse {
                provider,
                message: format!("unexpected HTTP {status}: {message}"),
            },
        }
    }
}

/// Pull a human-readable message out of a provider error body.
///
/// Providers disagree on the envelope (`{"error": {"message": ...}}` for
/// OpenAI-style, `{"error": {"message": ...}}` for Gemini,
/// `{"error": {"message": ...}, "type": "error"}` for Anthropic), but all of
/// them nest a `message` under `error`. Falls back to the raw body.
pub(crate) fn error_message_from_body(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| {
            if body.is_empty() {
                "(empty body)".to_string()
            } else {
                body.to_string()
            }
        })
}

/// Parse a `retry-after` header value (seconds form only).
pub(crate) fn retry_after_from_headers(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::unauthorized(StatusCode::UNAUTHORIZED)]
    #[case::forbidden(StatusCode::FORBIDDEN)]
    fn test_auth_statuses(#[case] status: StatusCode) {
        let err = DiscoveryError::from_status(
            Provider::OpenAi,
            status,
            None,
            "invalid key".to_string(),
        );
        assert!(matches!(err, DiscoveryError::Authentication { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rate_limit_status_carries_hint() {
        let err = DiscoveryError::from_status(
            Provider::Gemini,
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(7)),
            "quota exceeded".to_string(),
        );
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    }

    #[rstest]
    #[case::internal(StatusCode::INTERNAL_SERVER_ERROR)]
    #[case::bad_gateway(StatusCode::BAD_GATEWAY)]
    #[case::unavailable(StatusCode::SERVICE_UNAVAILABLE)]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT)]
    fn test_server_errors_are_transport(#[case] status: StatusCode) {
        let err =
            DiscoveryError::from_status(Provider::Anthropic, status, None, "boom".to_string());
        assert!(matches!(err, DiscoveryError::Transport { .. }));
        assert!(err.is_retryable());
    }

    #[rstest]
    #[case::bad_request(StatusCode::BAD_REQUEST)]
    #[case::not_found(StatusCode::NOT_FOUND)]
    #[case::teapot(StatusCode::IM_A_TEAPOT)]
    fn test_unexpected_client_errors_are_malformed(#[case] status: StatusCode) {
        let err = DiscoveryError::from_status(Provider::OpenAi, status, None, "nope".to_string());
        assert!(matches!(err, DiscoveryError::MalformedResponse { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found_is_not_retryable() {
        let err = DiscoveryError::NotFound {
            provider: Provider::Gemini,
            model_id: "gemini-9000".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.provider(), Provider::Gemini);
    }

    #[test]
    fn test_error_message_from_openai_style_body() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(error_message_from_body(body), "Incorrect API key provided");
    }

    #[test]
    fn test_error_message_from_unstructured_body() {
        assert_eq!(error_message_from_body("service melting"), "service melting");
        assert_eq!(error_message_from_body(""), "(empty body)");
    }

    #[test]
    fn test_retry_after_header_parsing() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(reqwest::header::RETRY_AFTER, "12".parse().unwrap());
        assert_eq!(
            retry_after_from_headers(&headers),
            Some(Duration::from_secs(12))
        );

        // HTTP-date form is ignored rather than misparsed.
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(retry_after_from_headers(&headers), None);
    }
}
