//! Ticket module - the locate-request record synchronized to the feature store

use crate::geometry::Geometry;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute holding the unique ticket number
pub const TICKET_NUMBER: &str = "ticketNumber";

/// Attribute holding the overall OPEN/CLOSED state
pub const STATUS: &str = "status";

/// Attribute stamped with the build time (epoch milliseconds)
pub const LAST_AUTOMATIC_UPDATE: &str = "lastAutomaticUpdate";

/// Overall ticket state derived from the per-district status table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    /// At least one district has not closed the ticket
    Open,

    /// Every district reports a closed status
    Closed,
}

impl TicketStatus {
    /// Get the status as stored in the feature layer
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::Closed => "CLOSED",
        }
    }

    /// Parse a status (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "OPEN" => Some(TicketStatus::Open),
            "CLOSED" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A required attribute was absent when constructing a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingAttribute(pub &'static str);

impl fmt::Display for MissingAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing required attribute '{}'", self.0)
    }
}

impl std::error::Error for MissingAttribute {}

/// One locate ticket extracted from a notice.
///
/// Records are immutable once built; a new notice produces a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRecord {
    ticket_number: String,
    attributes: BTreeMap<String, String>,
    geometry: Geometry,
}

impl TicketRecord {
    /// Create a record from its attributes and geometry.
    ///
    /// Fails if `ticketNumber` is absent or blank; there is no partial record.
    ///
    /// # Examples
    ///
    /// ```
    /// use ocgis_domain::{Geometry, SpatialReference, TicketRecord};
    /// use std::collections::BTreeMap;
    ///
    /// let mut attributes = BTreeMap::new();
    /// attributes.insert("ticketNumber".to_string(), "A1".to_string());
    /// let record = TicketRecord::new(attributes, Geometry::empty(SpatialReference::WGS84)).unwrap();
    /// assert_eq!(record.ticket_number(), "A1");
    ///
    /// let err = TicketRecord::new(BTreeMap::new(), Geometry::empty(SpatialReference::WGS84));
    /// assert!(err.is_err());
    /// ```
    pub fn new(
        attributes: BTreeMap<String, String>,
        geometry: Geometry,
    ) -> Result<Self, MissingAttribute> {
        let ticket_number = attributes
            .get(TICKET_NUMBER)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(MissingAttribute(TICKET_NUMBER))?;

        Ok(Self {
            ticket_number,
            attributes,
            geometry,
        })
    }

    /// Unique ticket number
    pub fn ticket_number(&self) -> &str {
        &self.ticket_number
    }

    /// All attributes, including district statuses and the overall status
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Look up one attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Overall status, if the record carries a recognizable one
    pub fn status(&self) -> Option<TicketStatus> {
        self.attribute(STATUS).and_then(TicketStatus::parse)
    }

    /// Polygon geometry
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}
