//! Error types for feature store adapters

use thiserror::Error;

/// Errors that can occur while talking to a feature store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Network or HTTP communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// The service answered with something we could not read
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service reported an error in its response body
    #[error("Service error {code}: {message}")]
    Service {
        /// Service error code
        code: i64,
        /// Service error message
        message: String,
    },

    /// The store is unavailable (used by test doubles)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A ticket number that cannot be written as a literal for the ticket field
    #[error("Invalid ticket number for a numeric field: '{0}'")]
    InvalidTicket(String),

    /// Invalid adapter configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::InvalidResponse(e.to_string())
        } else if e.is_timeout() {
            StoreError::Communication(format!("Request timed out: {}", e))
        } else {
            match e.status() {
                Some(status) => StoreError::Communication(format!("HTTP {}: {}", status, e)),
                None => StoreError::Communication(e.to_string()),
            }
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvalidResponse(format!("JSON parsing error: {}", e))
    }
}
