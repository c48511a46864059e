//! Retry with exponential backoff for transient discovery failures.
//!
//! Only failures that can plausibly clear on their own are retried: rate
//! limits and transport errors. Rejected credentials and malformed responses
//! fail immediately; retrying them cannot change the outcome.

use std::future::Future;

use tracing::{debug, warn};

use crate::{catalog::Provider, config::RetryConfig, providers::error::DiscoveryError};

/// Execute an async discovery operation with retry logic.
///
/// `make_call` is invoked for each attempt. Returns the first success, or the
/// last error once retries are exhausted. A rate-limit retry-after hint takes
/// precedence over the computed backoff when it is longer.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider: Provider,
    operation: &str,
    make_call: F,
) -> Result<T, DiscoveryError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, DiscoveryError>>,
{
    if !config.enabled {
        return make_call().await;
    }

    let max_attempts = config.max_retries + 1; // +1 for the initial attempt

    for attempt in 0..max_attempts {
        match make_call().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        provider = %provider,
                        operation,
                        attempt = attempt + 1,
                        "discovery succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(error) => {
                if error.is_retryable() && attempt < max_attempts - 1 {
                    let mut delay = config.delay_for_attempt(attempt);
                    if let Some(hint) = error.retry_after() {
                        delay = delay.max(hint);
                    }
                    warn!(
                        provider = %provider,
                        operation,
                        error = %error,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retryable discovery error, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }

                if attempt > 0 {
                    warn!(
                        provider = %provider,
                        operation,
                        error = %error,
                        attempts = attempt + 1,
                        "discovery failed after all retry attempts"
                    );
                }

                return Err(error);
            }
        }
    }

    unreachable!("retry loop should have returned")
}
