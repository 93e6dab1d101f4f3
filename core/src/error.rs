use crate::types::{CheckId, SourceId};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Source '{source_id}' unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },

    #[error("Aggregation invariant violated: {0}")]
    AggregationInvariantViolation(String),

    #[error("Check {check_id} was cancelled")]
    Cancelled { check_id: CheckId },

    #[error("Source '{source_id}' is already registered")]
    DuplicateSource { source_id: SourceId },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CheckResult<T> = Result<T, CheckError>;

/// Failure reported by a record source. Never escapes an adapter:
/// adapters turn it into a failed finding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
