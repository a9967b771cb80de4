//! Structured error types for the domain layer.

use symscout_requests::RequestError;
use thiserror::Error;

/// Errors surfaced by lookup, validation, table assembly and persistence.
///
/// Designed to be displayable at the CLI boundary without further context.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("request failed: {0}")]
    Request(#[from] RequestError),

    #[error("hard stop: provider has blocked requests, retry in {remaining_secs}s")]
    BreakerOpen { remaining_secs: u64 },

    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("unknown asset type '{0}', choose from equity, mutualfund, etf, index, future, currency, cryptocurrency")]
    UnknownAssetType(String),

    #[error("unknown output format '{0}', choose from parquet, csv, sqlite")]
    UnknownFormat(String),

    #[error("dataframe error: {0}")]
    Frame(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}
