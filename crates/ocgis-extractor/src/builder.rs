//! Composes the extractors into one ticket record

use crate::config::{ExtractorConfig, MissingStatusTablePolicy, SelectorMap};
use crate::document::{HtmlDocument, LayoutDocument, QueryDocument};
use crate::error::ExtractorError;
use crate::fields::extract_fields;
use crate::geometry::GeometryExtractor;
use crate::reproject::Reprojector;
use crate::status::StatusTableExtractor;
use crate::types::{BuiltTicket, Diagnostic};
use ocgis_domain::ticket::{LAST_AUTOMATIC_UPDATE, STATUS, TICKET_NUMBER};
use ocgis_domain::{Geometry, TicketRecord, TicketStatus};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Turns notice documents into immutable ticket records.
///
/// Built once per run from a validated configuration and shared by every
/// extraction task; building a record never mutates the builder.
#[derive(Debug, Clone)]
pub struct TicketRecordBuilder {
    selectors: SelectorMap,
    block_selector: String,
    missing_status_table: MissingStatusTablePolicy,
    status: StatusTableExtractor,
    geometry: GeometryExtractor,
    reprojector: Reprojector,
}

impl TicketRecordBuilder {
    /// Create a builder, validating the configuration and resolving projections
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        Ok(Self {
            selectors: config.selectors.clone(),
            block_selector: config.geometry.block_selector.clone(),
            missing_status_table: config.missing_status_table,
            status: StatusTableExtractor::from_config(config),
            geometry: GeometryExtractor::from_config(config),
            reprojector: Reprojector::from_config(config)?,
        })
    }

    /// Build a record from notice markup, stamped with the current time
    pub fn build(&self, markup: &str) -> Result<BuiltTicket, ExtractorError> {
        self.build_at(markup, now_millis())
    }

    /// Build a record from notice markup with an explicit update stamp
    /// (milliseconds since the Unix epoch)
    pub fn build_at(&self, markup: &str, stamp_ms: i64) -> Result<BuiltTicket, ExtractorError> {
        let doc = HtmlDocument::parse(markup, &self.block_selector)?;
        self.build_document(&doc, stamp_ms)
    }

    /// Build a record from an already parsed document
    pub fn build_document<D>(&self, doc: &D, stamp_ms: i64) -> Result<BuiltTicket, ExtractorError>
    where
        D: QueryDocument + LayoutDocument + ?Sized,
    {
        let extraction = extract_fields(doc, &self.selectors);
        let mut diagnostics = extraction.diagnostics;
        let mut attributes = extraction.fields;

        // No partial records: check the key before the heavier passes
        if !attributes.contains_key(TICKET_NUMBER) {
            warn!("Notice has no ticket number");
            return Err(ExtractorError::MissingKey(TICKET_NUMBER.to_string()));
        }

        let overall = match self.status.extract(doc) {
            Ok(outcome) => {
                if outcome.rows.is_empty() {
                    diagnostics.push(Diagnostic::NoStatusRows);
                }
                // Status-table fields win over selector fields
                attributes.extend(outcome.district_fields);
                outcome.overall
            }
            Err(ExtractorError::StatusTableMissing(headers)) => match self.missing_status_table {
                MissingStatusTablePolicy::Reject => {
                    return Err(ExtractorError::StatusTableMissing(headers));
                }
                MissingStatusTablePolicy::FlagOpen => {
                    diagnostics.push(Diagnostic::StatusTableMissing);
                    TicketStatus::Open
                }
            },
            Err(e) => return Err(e),
        };
        attributes.insert(STATUS.to_string(), overall.as_str().to_string());
        attributes.insert(LAST_AUTOMATIC_UPDATE.to_string(), stamp_ms.to_string());

        let rings = self.geometry.extract_rings(doc);
        diagnostics.extend(rings.diagnostics);
        if rings.rings.is_empty() {
            diagnostics.push(Diagnostic::NoGeometry);
        }
        let source = Geometry::new(rings.rings, self.reprojector.source());
        let geometry = self.reprojector.reproject_geometry(&source)?;

        let record = TicketRecord::new(attributes, geometry)?;
        debug!(
            ticket = record.ticket_number(),
            status = %overall,
            rings = record.geometry().rings.len(),
            diagnostics = diagnostics.len(),
            "Built ticket record"
        );
        if !diagnostics.is_empty() {
            info!(
                ticket = record.ticket_number(),
                diagnostics = %join_diagnostics(&diagnostics),
                "Ticket extracted with diagnostics"
            );
        }

        Ok(BuiltTicket {
            record,
            diagnostics,
        })
    }
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
