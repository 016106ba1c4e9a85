//! Error types for sync runs

use thiserror::Error;

/// Run-level failures; a run that returns one of these did not submit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The notice source could not be read
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The store refused the submission
    #[error("Submit error: {reason} ({} processed, {} skipped)", .processed.len(), .skipped.len())]
    Submit {
        /// Error reported by the store
        reason: String,
        /// Ticket numbers built and reconciled in this run
        processed: Vec<String>,
        /// Notices that were not turned into records (source names)
        skipped: Vec<String>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
