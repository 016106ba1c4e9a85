//! OcGis Extractor
//!
//! Turns one locate-ticket notice into an immutable [`TicketRecord`].
//!
//! # Overview
//!
//! A notice is a semi-structured HTML document. The builder runs three
//! independent passes over it and composes their output:
//!
//! - **Fields**: selector-driven extraction of flat attributes ([`extract_fields`])
//! - **Status table**: per-district statuses and the overall OPEN/CLOSED flag
//!   ([`StatusTableExtractor`])
//! - **Geometry**: polygon rings read from the free-text layout
//!   ([`GeometryExtractor`]), then reprojected to the store's spatial
//!   reference ([`Reprojector`])
//!
//! # Architecture
//!
//! ```text
//! markup → HtmlDocument ─┬→ fields ──────────┐
//!                        ├→ status table ────┼→ TicketRecord
//!                        └→ rings → reproject┘
//! ```
//!
//! Extraction reads documents through two small traits, [`QueryDocument`] and
//! [`LayoutDocument`], so the passes can be tested without markup.
//! Field misses and layout anomalies are returned as [`Diagnostic`] values
//! next to the record; only a missing ticket number (and, by default, a
//! missing status table) fails the document.
//!
//! # Example Usage
//!
//! ```no_run
//! use ocgis_extractor::{ExtractorConfig, TicketRecordBuilder};
//!
//! # fn example(markup: &str) -> Result<(), ocgis_extractor::ExtractorError> {
//! let builder = TicketRecordBuilder::new(&ExtractorConfig::default())?;
//! let built = builder.build(markup)?;
//!
//! println!("{}: {:?}", built.record.ticket_number(), built.record.status());
//! for diagnostic in &built.diagnostics {
//!     println!("  {}", diagnostic);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`TicketRecord`]: ocgis_domain::TicketRecord

#![warn(missing_docs)]

mod builder;
mod config;
mod document;
mod error;
mod fields;
mod geometry;
mod reproject;
mod status;
mod types;

#[cfg(test)]
mod tests;

pub use builder::TicketRecordBuilder;
pub use config::{
    CoordinateOrder, ExtractorConfig, FieldRule, GeometryConfig, MissingStatusTablePolicy,
    SelectorMap, StatusTableConfig,
};
pub use document::{normalize_ws, HtmlDocument, LayoutBlock, LayoutDocument, QueryDocument, TableData};
pub use error::ExtractorError;
pub use fields::extract_fields;
pub use geometry::{parse_coordinate_pair, GeometryExtractor, RingExtraction};
pub use reproject::Reprojector;
pub use status::{StatusOutcome, StatusTableExtractor};
pub use types::{BuiltTicket, Diagnostic, FieldExtraction, StatusRow};
