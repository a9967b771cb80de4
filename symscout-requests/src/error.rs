//! Structured error types for the request engine.

use thiserror::Error;

/// Errors produced while building or executing a batch.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Caller contract violation: misaligned batch inputs, bad pool files,
    /// unusable proxy URIs. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A retryable failure class exhausted its attempt and time budgets.
    #[error("transient request failure after {attempts} attempts: {message}")]
    TransientRequestFailed {
        attempts: u32,
        last_status: Option<u16>,
        message: String,
    },

    /// The response status fell outside the retryable classes.
    #[error("request failed with status {status}")]
    Status { status: u16 },

    /// A transport failure that is not worth retrying.
    #[error("network error: {0}")]
    Network(String),

    /// Body decode or parse-strategy failure. Never retried.
    #[error("parse error: {0}")]
    Parse(String),
}

impl RequestError {
    /// The last HTTP status associated with this error, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TransientRequestFailed { last_status, .. } => *last_status,
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}
