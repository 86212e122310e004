//! Error types for the review engine.
//!
//! Ingestion recovers from `Provider` and per-record `Database` failures
//! locally (they surface as entries in the ingestion report, never as hard
//! failures); `InvalidInput` and `NotFound` propagate to the caller.

use thiserror::Error;

/// Common result type for review engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// One upstream source was unreachable or returned a malformed payload.
    #[error("provider '{source_name}' failed: {message}")]
    Provider { source_name: String, message: String },

    /// Database operation error (wraps sqlx::Error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid caller input (bad moderation status, empty update, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation targeted a review or product that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap a fetch failure as a provider error for the given source.
    pub fn provider(source: &str, message: impl Into<String>) -> Self {
        Error::Provider {
            source_name: source.to_string(),
            message: message.into(),
        }
    }
}
