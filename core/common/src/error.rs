//! Common error types for the artifact sync pipeline.

use thiserror::Error;

/// Top-level error type for pipeline operations.
///
/// Every failure is surfaced to the invoking stage; nothing in the pipeline
/// retries. `Transfer` is the only kind tolerated per-file during a bulk
/// download, and even there the run still fails if nothing was retrieved.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (credentials, paths, folders).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token refresh or authorization failure.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network or backend failure during a transfer operation.
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// An artifact that should exist after an operation is missing or empty.
    #[error("Verification error: {0}")]
    Verification(String),

    /// Archive container operation failed.
    #[error("Archive error: {0}")]
    Archive(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
