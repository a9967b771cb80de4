//! Retry policy: which failures are worth another attempt.
//!
//! Server errors (5xx) and client errors (4xx) are classified independently;
//! 5xx responses are usually transient while a 4xx rarely succeeds on retry,
//! so the defaults retry server errors and network failures only. HTTP 429 is
//! always treated as transient.

use crate::backoff::Backoff;
use reqwest::StatusCode;
use std::time::Duration;

/// What to do with a completed HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    Retry,
    Fail,
}

/// Retry configuration for the single-request executor.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first.
    pub max_attempts: u32,
    /// Wall-clock budget across all of an item's retries.
    pub max_elapsed: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub jitter_ms: u64,
    pub retry_server_errors: bool,
    pub retry_client_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_elapsed: Duration::from_secs(60),
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_ms: 100,
            retry_server_errors: true,
            retry_client_errors: false,
        }
    }
}

impl RetryPolicy {
    pub fn classify(&self, status: StatusCode) -> Disposition {
        if status == StatusCode::TOO_MANY_REQUESTS {
            Disposition::Retry
        } else if status.is_server_error() {
            if self.retry_server_errors {
                Disposition::Retry
            } else {
                Disposition::Fail
            }
        } else if status.is_client_error() {
            if self.retry_client_errors {
                Disposition::Retry
            } else {
                Disposition::Fail
            }
        } else {
            Disposition::Success
        }
    }

    pub(crate) fn backoff(&self) -> Backoff {
        Backoff::new(
            self.initial_delay,
            self.max_delay,
            self.multiplier,
            self.jitter_ms,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_retry_server_errors_only() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.classify(StatusCode::INTERNAL_SERVER_ERROR),
            Disposition::Retry
        );
        assert_eq!(policy.classify(StatusCode::NOT_FOUND), Disposition::Fail);
        assert_eq!(policy.classify(StatusCode::OK), Disposition::Success);
    }

    #[test]
    fn too_many_requests_is_always_transient() {
        let policy = RetryPolicy {
            retry_server_errors: false,
            retry_client_errors: false,
            ..RetryPolicy::default()
        };
        assert_eq!(
            policy.classify(StatusCode::TOO_MANY_REQUESTS),
            Disposition::Retry
        );
    }

    #[test]
    fn client_errors_become_retryable_when_enabled() {
        let policy = RetryPolicy {
            retry_client_errors: true,
            ..RetryPolicy::default()
        };
        assert_eq!(
            policy.classify(StatusCode::BAD_REQUEST),
            Disposition::Retry
        );
    }

    #[test]
    fn server_errors_can_be_made_fatal() {
        let policy = RetryPolicy {
            retry_server_errors: false,
            ..RetryPolicy::default()
        };
        assert_eq!(
            policy.classify(StatusCode::BAD_GATEWAY),
            Disposition::Fail
        );
    }
}
