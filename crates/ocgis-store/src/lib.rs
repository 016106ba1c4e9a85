//! OcGis Feature Store Layer
//!
//! Implementations of the `FeatureStore` trait from `ocgis-domain`.
//!
//! # Stores
//!
//! - `MemoryFeatureStore`: Deterministic in-memory store for tests and dry runs
//! - `FeatureLayerClient`: ArcGIS feature layer over the REST API
//!
//! # Examples
//!
//! ```
//! use ocgis_domain::traits::FeatureStore;
//! use ocgis_domain::{ChangeSet, TicketStatus};
//! use ocgis_store::MemoryFeatureStore;
//!
//! let store = MemoryFeatureStore::new();
//! store.insert("240815001", TicketStatus::Open);
//!
//! let result = store.submit(&ChangeSet::default()).unwrap();
//! assert!(result.fully_applied());
//! ```

#![warn(missing_docs)]

pub mod arcgis;
mod config;
mod error;
pub mod esri;
pub mod memory;

pub use arcgis::FeatureLayerClient;
pub use config::{StoreConfig, TOKEN_ENV};
pub use error::StoreError;
pub use memory::{MemoryFeatureStore, StoredFeature};
