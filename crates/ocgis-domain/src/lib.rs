//! OcGis Domain Layer
//!
//! This crate contains the domain model shared by every other OcGis crate.
//! It has ZERO external dependencies and defines the value types for locate
//! tickets, their polygon geometry, and the change sets exchanged with the
//! remote feature store, plus the trait seams to external collaborators.
//!
//! ## Key Concepts
//!
//! - **Ticket**: A locate-request notice identified by a unique ticket number
//! - **Geometry**: Polygon rings tagged with one spatial reference
//! - **Change set**: Adds, updates and deletes bound for the feature store
//! - **Raw notice**: One unparsed notice document with a stable sequence number
//!
//! ## Architecture
//!
//! - No external crate dependencies
//! - Pure data and small invariants only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod change;
pub mod geometry;
pub mod notice;
pub mod ticket;
pub mod traits;

// Re-exports for convenience
pub use change::{ChangeSet, EditFailure, RemoteMatch, RemoteTicket, SubmitResult, TicketUpdate};
pub use geometry::{Geometry, Point, Ring, SpatialReference};
pub use notice::{split_notices, RawNotice};
pub use ticket::{MissingAttribute, TicketRecord, TicketStatus};
