//! Common error types for ChordLine

use thiserror::Error;

/// Common result type for ChordLine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across ChordLine crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upstream HTTP call failed or returned an unexpected status
    #[error("HTTP error: {0}")]
    Http(String),

    /// Credential missing, rejected, or could not be refreshed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
