//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the sync pipeline and the
//! systems it talks to. Implementations live in other crates.

use crate::change::{ChangeSet, RemoteMatch, RemoteTicket, SubmitResult};
use crate::notice::RawNotice;
use std::collections::HashMap;

/// Trait for the remote feature store holding the ticket inventory
///
/// Implemented by the infrastructure layer (ocgis-store)
pub trait FeatureStore {
    /// Error type for store operations
    type Error;

    /// Check whether a feature with the ticket number exists
    fn lookup(&self, ticket_number: &str) -> Result<RemoteMatch, Self::Error>;

    /// Check many ticket numbers in one round trip.
    ///
    /// Returns `None` when the store has no bulk query. A successful answer
    /// lists only the tickets that exist; any ticket number missing from the
    /// map does not exist in the store.
    fn bulk_lookup(
        &self,
        _ticket_numbers: &[String],
    ) -> Option<Result<HashMap<String, RemoteMatch>, Self::Error>> {
        None
    }

    /// List every ticket the store currently marks OPEN
    fn query_open(&self) -> Result<Vec<RemoteTicket>, Self::Error>;

    /// Apply adds, updates and deletes
    fn submit(&self, changes: &ChangeSet) -> Result<SubmitResult, Self::Error>;
}

/// Trait for the source of raw notice documents
///
/// Authentication and page navigation stay behind this seam.
pub trait NoticeSource {
    /// Error type for fetch operations
    type Error;

    /// Fetch the current batch of notices, each with a stable sequence number
    fn fetch_notices(&self) -> Result<Vec<RawNotice>, Self::Error>;
}
