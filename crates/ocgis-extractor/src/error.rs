//! Error types for the Extractor

use ocgis_domain::MissingAttribute;
use thiserror::Error;

/// Errors that can occur while turning a notice into a ticket record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractorError {
    /// A selector expression could not be parsed
    #[error("Invalid selector '{selector}': {reason}")]
    Selector {
        /// Offending expression
        selector: String,
        /// Parser message
        reason: String,
    },

    /// A required attribute (the ticket number) is absent
    #[error("Missing required field: {0}")]
    MissingKey(String),

    /// No table carries the required status headers
    #[error("Status table not found (required headers: {})", .0.join(", "))]
    StatusTableMissing(Vec<String>),

    /// Coordinate reprojection failed
    #[error("Projection error: {0}")]
    Projection(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<MissingAttribute> for ExtractorError {
    fn from(e: MissingAttribute) -> Self {
        ExtractorError::MissingKey(e.0.to_string())
    }
}
