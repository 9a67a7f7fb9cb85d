//! Error types for lectern-rd
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for the lectern-rd module
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Speech engine errors
    #[error("Speech error: {0}")]
    Speech(String),

    /// Content fetching or extraction errors
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from lectern-common
    #[error(transparent)]
    Common(#[from] lectern_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using lectern-rd Error
pub type Result<T> = std::result::Result<T, Error>;
