//! Error types for footfall-core

use thiserror::Error;

/// Main error type for the footfall-core library
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

    /// Caller lacks the access level a query requires
    #[error("forbidden: {0} requires admin access")]
    Forbidden(&'static str),

    /// Rollup job failed outside the storage layer
    #[error("rollup job error: {0}")]
    Job(String),
}

/// Result type alias for footfall-core
pub type Result<T> = std::result::Result<T, Error>;
