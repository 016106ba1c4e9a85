//! OcGis Sync
//!
//! Runs the ticket pipeline end to end: fetch notices, build records,
//! reconcile them against the feature store and submit the edits.
//!
//! # Overview
//!
//! A run is responsible for:
//! - **Extraction**: Building one record per notice with bounded parallelism
//! - **Reconciliation**: Splitting the batch into adds and updates after dropping repeats
//! - **Stale tickets**: Optionally deleting OPEN store tickets absent from the batch
//! - **Submission**: Sending the change set in one request (skipped on dry runs)
//! - **Metrics collection**: Tracking runs for monitoring
//!
//! # Failure Handling
//!
//! | Problem | Effect |
//! |---------|--------|
//! | Notice without a ticket number | Listed in `failures`, run continues |
//! | Repeated ticket number | First occurrence kept, repeat listed in `duplicates` |
//! | Store lookup fails | Ticket listed in `reconciliation.failures`, never added |
//! | Run timeout | Unscheduled work abandoned, completed results kept |
//! | Source unreadable | Run fails with [`SyncError::Fetch`] |
//! | Submission refused | Run fails with [`SyncError::Submit`] |
//!
//! # Usage
//!
//! ## Reconciling a batch
//!
//! ```
//! use ocgis_domain::{Geometry, SpatialReference, TicketRecord};
//! use ocgis_store::MemoryFeatureStore;
//! use ocgis_sync::Reconciler;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let record = |ticket: &str| {
//!     let attributes = BTreeMap::from([("ticketNumber".to_string(), ticket.to_string())]);
//!     TicketRecord::new(attributes, Geometry::empty(SpatialReference::WEB_MERCATOR)).unwrap()
//! };
//!
//! let store = MemoryFeatureStore::new();
//! let result = Reconciler::new(4, 200)
//!     .reconcile(vec![record("A"), record("A")], Arc::new(store), None)
//!     .await;
//!
//! assert_eq!(result.changes.adds.len(), 1);
//! assert_eq!(result.duplicates.len(), 1);
//! # }
//! ```
//!
//! ## Configuration Presets
//!
//! ```
//! use ocgis_sync::SyncConfig;
//!
//! // Default: 4 workers, 5 minute run timeout, hourly runs
//! let config = SyncConfig::default();
//!
//! // Aggressive: more parallelism, runs every 15 minutes
//! let config = SyncConfig::aggressive();
//!
//! // Lenient: serial work, runs every 4 hours
//! let config = SyncConfig::lenient();
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [sync]
//! workers = 4
//! lookup_concurrency = 4
//! bulk_lookup_chunk = 200
//! run_timeout_secs = 300
//! stale_ticket_policy = "ignore"
//! requery_open = true
//! dry_run = false
//! interval_minutes = 60
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod orchestrator;
mod reconciler;
mod worker;

pub use config::{StaleTicketPolicy, SyncConfig};
pub use error::SyncError;
pub use metrics::SyncMetrics;
pub use orchestrator::{DocumentFailure, NoticeDiagnostic, RunReport, SyncOrchestrator};
pub use reconciler::{
    classify, Duplicate, LookupFailure, LookupOutcome, ReconciliationResult, Reconciler,
};
pub use worker::SyncWorker;
