//! Error types for callpulse-core

use thiserror::Error;

/// Main error type for the callpulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Period string that does not parse to an integer year/subunit
    #[error("malformed period {input:?}: {reason}")]
    MalformedPeriod { input: String, reason: String },

    /// Unknown granularity name
    #[error("invalid granularity: {0}")]
    InvalidGranularity(String),

    /// Unknown aggregation policy name
    #[error("invalid aggregation: {0}")]
    InvalidAggregation(String),

    /// Unknown metric direction name
    #[error("invalid direction: {0}")]
    InvalidDirection(String),

    /// Metric not found in the record store
    #[error("metric not found: {0}")]
    MetricNotFound(String),
}

impl Error {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        Error::MalformedPeriod {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for callpulse-core
pub type Result<T> = std::result::Result<T, Error>;
