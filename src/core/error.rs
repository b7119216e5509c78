//! Error types for each pipeline step

use chrono::NaiveDate;
use std::fmt::Display;
use thiserror::Error;

/// Errors raised while reading one of the upstream sources.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure or a non-success HTTP status.
    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// The payload no longer has the expected shape.
    #[error("Failed to parse {source_name} response: {reason}")]
    ParseFailure { source_name: String, reason: String },

    #[error("Product type '{0}' not found in gold price list")]
    ProductNotFound(String),
}

impl FetchError {
    pub fn unavailable(source_name: &str, reason: impl Display) -> Self {
        FetchError::SourceUnavailable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(source_name: &str, reason: impl Display) -> Self {
        FetchError::ParseFailure {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Which side of the pairing an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Rate,
    Gold,
}

impl Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Rate => write!(f, "rate"),
            Side::Gold => write!(f, "gold"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Malformed rate value: '{0}'")]
    MalformedRate(String),

    #[error("No observation has a valid date")]
    NoValidDates,

    #[error("No {side} observations left after dropping unparseable dates")]
    EmptyAfterFiltering { side: Side },

    #[error("Rate date {rate_date} does not match gold date {gold_date}")]
    DateMismatch {
        rate_date: NaiveDate,
        gold_date: NaiveDate,
    },
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to connect to store: {0}")]
    ConnectionFailure(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid date stored in row: '{0}'")]
    CorruptRow(String),
}

/// Any failure of a single pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Task '{0}' was aborted")]
    Aborted(String),
}
