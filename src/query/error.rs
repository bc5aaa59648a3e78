//! Query error types
//!
//! Defines all error conditions that can occur while decoding, compiling,
//! or executing a query, plus the status classification and error payload
//! shape consumed by the transport layer.

use serde::Serialize;
use thiserror::Error;

/// Which bound of a timestamp range failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    Start,
    End,
}

impl std::fmt::Display for TimeBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "startTime"),
            Self::End => write!(f, "endTime"),
        }
    }
}

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// A recognized top-level key carried the wrong value shape, or the
    /// key itself is unknown
    #[error("Bad request in key '{0}'")]
    BadRequestKey(String),

    /// Relative time token did not parse as now-N[s/m/h/d]
    #[error("Time '{0}' should be in now-N[d/h/m/s] format")]
    InvalidTimeFormat(String),

    /// Both start_time/end_time keys and timestamp-field operator clauses
    /// were supplied
    #[error("Both start_time/end_time and timestamp operator clauses provided")]
    AmbiguousTimeWindow,

    /// Timestamp-field operator clauses must come as a lower/upper pair
    #[error("Provide both startTime and endTime")]
    IncompleteTimeRange,

    /// A timestamp bound value was not numeric
    #[error("Invalid {0}")]
    InvalidTimestampValue(TimeBound),

    /// Resolved window had start after end
    #[error("Time window start {start} is greater than end {end}")]
    InvalidTimeWindow { start: i64, end: i64 },

    /// Aggregate and plain select keys in the same request
    #[error("Aggregate and non-aggregate keys are mutually exclusive")]
    MixedSelectMode,

    /// Aggregate select key was malformed or unsupported
    #[error("Aggregate key '{0}' is not valid")]
    InvalidAggregateKey(String),

    /// Sort order token was neither "asc" nor "desc"
    #[error("Order can be 'asc' or 'desc', provided '{0}'")]
    InvalidSortOrder(String),

    /// Backend query execution failed
    #[error("Backend query failed: {0}")]
    Backend(#[from] crate::backend::BackendError),
}

/// Status classification surfaced alongside the error payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    /// Client-caused: malformed or contradictory request
    BadRequest,
    /// Server-side: backend execution failure
    Internal,
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest => write!(f, "bad request"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl QueryError {
    /// Classify this error for the transport boundary.
    ///
    /// Every compilation-stage error is client-caused; only backend
    /// execution failures are internal.
    pub fn status(&self) -> ErrorStatus {
        match self {
            Self::Backend(_) => ErrorStatus::Internal,
            _ => ErrorStatus::BadRequest,
        }
    }
}

/// Error response body: `{"error":{"message":"..."}}`
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ErrorPayload {
    /// Build the payload for a query error
    pub fn new(err: &QueryError) -> Self {
        Self {
            error: ErrorBody {
                message: err.to_string(),
            },
        }
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
