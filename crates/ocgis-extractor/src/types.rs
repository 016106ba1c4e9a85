//! Extraction results and diagnostics

use ocgis_domain::TicketRecord;
use std::collections::BTreeMap;
use std::fmt;

/// A non-fatal observation made while extracting one notice
///
/// Field misses, unmapped fields and layout anomalies never fail a document,
/// but an operator reviewing a ticket needs to see them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The field's selector is empty; extraction was skipped
    FieldUnmapped(String),

    /// The selector matched nothing, or only whitespace
    FieldNotFound {
        /// Logical field name
        field: String,
        /// Selector that was evaluated
        selector: String,
    },

    /// The selector could not be evaluated; treated as a miss
    SelectorFailed {
        /// Logical field name
        field: String,
        /// Evaluation error
        reason: String,
    },

    /// No table carries the required status headers; the ticket was kept OPEN
    StatusTableMissing,

    /// The status table had no body rows; the ticket was kept OPEN
    NoStatusRows,

    /// A ring header collected no coordinates and was dropped
    RingWithoutPoints(String),

    /// The notice carries no polygon at all
    NoGeometry,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::FieldUnmapped(field) => write!(f, "field '{}' is unmapped", field),
            Diagnostic::FieldNotFound { field, selector } => {
                write!(f, "field '{}' not found (selector '{}')", field, selector)
            }
            Diagnostic::SelectorFailed { field, reason } => {
                write!(f, "field '{}' skipped: {}", field, reason)
            }
            Diagnostic::StatusTableMissing => write!(f, "status table not found"),
            Diagnostic::NoStatusRows => write!(f, "status table has no rows"),
            Diagnostic::RingWithoutPoints(label) => {
                write!(f, "ring '{}' has no coordinates", label)
            }
            Diagnostic::NoGeometry => write!(f, "no polygon found"),
        }
    }
}

/// Output of the field extractor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldExtraction {
    /// Field name → normalized text
    pub fields: BTreeMap<String, String>,

    /// Misses and skipped fields
    pub diagnostics: Vec<Diagnostic>,
}

/// One status table row, zipped by header position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    /// District (utility owner)
    pub district: String,

    /// Company name
    pub company_name: String,

    /// Status text as printed
    pub status: String,
}

/// A ticket record together with what extraction noticed on the way
#[derive(Debug, Clone)]
pub struct BuiltTicket {
    /// The immutable record
    pub record: TicketRecord,

    /// Non-fatal diagnostics for this document
    pub diagnostics: Vec<Diagnostic>,
}
