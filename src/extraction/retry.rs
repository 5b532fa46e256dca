//! Bounded retry with exponential backoff around idempotent HTTP requests.

use crate::extraction::error::ExtractionError;
use bon::Builder;
use log::warn;
use reqwest::{Method, Response, StatusCode};
use std::future::Future;
use std::time::Duration;

/// Retry policy applied to every outbound request of the extractor.
///
/// A request is retried only when its method is listed in `retry_methods` and the
/// attempt ended in one of `retry_statuses` or a transient transport error (connect
/// failure, timeout). Between attempts the caller sleeps `base_delay * 2^(attempt - 1)`,
/// so the defaults wait 1s and then 2s before giving up on the third attempt.
///
/// # Examples
///
/// ```
/// use collision_etl::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_attempts(5)
///     .base_delay(Duration::from_millis(200))
///     .build();
/// assert_eq!(policy.max_attempts(), 5);
/// ```
#[derive(Debug, Clone, Builder)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    #[builder(default = 3)]
    max_attempts: u32,
    #[builder(default = Duration::from_secs(1))]
    base_delay: Duration,
    #[builder(default = vec![
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusCode::BAD_GATEWAY,
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::GATEWAY_TIMEOUT,
    ])]
    retry_statuses: Vec<StatusCode>,
    #[builder(default = vec![Method::GET, Method::HEAD, Method::OPTIONS])]
    retry_methods: Vec<Method>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::builder().build()
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep before attempt `attempt + 1`.
    pub(crate) fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    fn is_retryable(&self, outcome: &reqwest::Result<Response>) -> bool {
        match outcome {
            Ok(response) => self.retry_statuses.contains(&response.status()),
            Err(e) => e.is_connect() || e.is_timeout(),
        }
    }

    /// Runs `request` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// `request` is called once per attempt and must build a fresh request each time.
    /// A final response with a non-success status becomes [`ExtractionError::HttpStatus`],
    /// a final transport error becomes [`ExtractionError::NetworkRequest`].
    pub async fn send<F, Fut>(
        &self,
        method: &Method,
        url: &str,
        mut request: F,
    ) -> Result<Response, ExtractionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = reqwest::Result<Response>>,
    {
        let attempts = if self.retry_methods.contains(method) {
            self.max_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            let outcome = request().await;

            if attempt < attempts && self.is_retryable(&outcome) {
                let delay = self.delay_for(attempt);
                match &outcome {
                    Ok(response) => warn!(
                        "{} {} returned {} (attempt {}/{}), retrying in {:?}",
                        method,
                        url,
                        response.status(),
                        attempt,
                        attempts,
                        delay
                    ),
                    Err(e) => warn!(
                        "{} {} failed: {} (attempt {}/{}), retrying in {:?}",
                        method, url, e, attempt, attempts, delay
                    ),
                }
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            return match outcome {
                Ok(response) if response.status().is_success() => Ok(response),
                Ok(response) => Err(ExtractionError::HttpStatus {
                    url: url.to_string(),
                    status: response.status(),
                }),
                Err(e) => Err(ExtractionError::NetworkRequest(url.to_string(), e)),
            };
        }
    }
}
