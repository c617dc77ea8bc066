//! Common error types for Dayside

use thiserror::Error;

/// Common result type for Dayside operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Dayside data layer
#[derive(Error, Debug)]
pub enum Error {
    /// Remote API returned a non-success response
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code from the remote
        status: u16,
        /// Human-readable message (status text or remote-provided)
        message: String,
        /// Structured detail payload, when the remote supplied one
        details: Option<serde_json::Value>,
    },

    /// Attribute value failed its declared type's validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// API misuse: undeclared attribute, missing id, operation on a
    /// deleted record
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure before an HTTP status was available
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build an API error from status code, status text, and optional body.
    pub fn api(status: u16, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Error::Api {
            status,
            message: message.into(),
            details,
        }
    }
}
