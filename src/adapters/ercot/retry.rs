//! Retry with exponential backoff for upstream HTTP requests.
//!
//! Transient failures are rate limiting (429), gateway errors (502, 503, 504)
//! and connection-level errors or timeouts.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Response;
use tracing::{debug, warn};

const MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn should_retry_status(&self, status: StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 502 | 503 | 504)
    }

    /// base * 2^attempt, capped at 30s.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(MAX_DELAY)
    }
}

pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

/// Run `make_request` until it yields a non-retryable outcome or the retry
/// budget is spent. The last response or error is returned as-is.
pub fn send_with_retry<F>(
    policy: &RetryPolicy,
    operation: &str,
    make_request: F,
) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Result<Response, reqwest::Error>,
{
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 0;

    loop {
        let last_attempt = attempt + 1 >= max_attempts;
        match make_request() {
            Ok(response) => {
                let status = response.status();
                if policy.should_retry_status(status) && !last_attempt {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        operation,
                        status = %status,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retryable status code, will retry after delay"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                    continue;
                }
                if attempt > 0 {
                    debug!(
                        operation,
                        status = %status,
                        attempt = attempt + 1,
                        "request finished after retry"
                    );
                }
                return Ok(response);
            }
            Err(error) => {
                if is_retryable_error(&error) && !last_attempt {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        operation,
                        error = %error,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "retryable error, will retry after delay"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                    continue;
                }
                if attempt > 0 {
                    warn!(
                        operation,
                        error = %error,
                        attempts = attempt + 1,
                        "request failed after all retry attempts"
                    );
                }
                return Err(error);
            }
        }
    }
}
