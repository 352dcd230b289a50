//! Domain-level error taxonomy for chipreg.
//!
//! Job outcomes (failed timing, crashed formal flows, exhausted retries) are
//! never errors: they are [`Status`](super::status::Status) values. The
//! variants here are the run-level conditions that abort a regression.

use std::path::PathBuf;

/// Errors produced while parsing catalog rows.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("line {line}: expected at least {expected} fields, found {found}")]
    MissingFields {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: empty {field}")]
    EmptyField { line: usize, field: &'static str },
}

/// chipreg run-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ChipregError {
    #[error("invalid catalog {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },

    #[error("unknown analysis domain: {0}")]
    UnknownDomain(String),

    #[error("unknown status: {0}")]
    UnknownStatus(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("state log {path}: {reason}")]
    StateLog { path: PathBuf, reason: String },

    #[error("result record {path}: {reason}")]
    ResultRecord { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for chipreg operations.
pub type Result<T> = std::result::Result<T, ChipregError>;
