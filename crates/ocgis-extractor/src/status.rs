//! Per-district status table extraction

use crate::config::{ExtractorConfig, StatusTableConfig};
use crate::document::{QueryDocument, TableData};
use crate::error::ExtractorError;
use crate::types::StatusRow;
use ocgis_domain::TicketStatus;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// What the status table says about a ticket
#[derive(Debug, Clone, PartialEq)]
pub struct StatusOutcome {
    /// Lower-cased tracked district → status text
    pub district_fields: BTreeMap<String, String>,

    /// OPEN if any row is not closed, or if there are no rows
    pub overall: TicketStatus,

    /// Rows read from the table, in order
    pub rows: Vec<StatusRow>,
}

/// Finds the status table and folds its rows into status fields
#[derive(Debug, Clone)]
pub struct StatusTableExtractor {
    layout: StatusTableConfig,
    tracked: HashSet<String>,
    closed: HashSet<String>,
}

impl StatusTableExtractor {
    /// Create an extractor; tracked districts are matched case-insensitively
    pub fn new(
        layout: StatusTableConfig,
        tracked_districts: impl IntoIterator<Item = String>,
        closed_statuses: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            layout,
            tracked: tracked_districts
                .into_iter()
                .map(|d| d.trim().to_lowercase())
                .collect(),
            closed: closed_statuses.into_iter().collect(),
        }
    }

    /// Create an extractor from the extractor configuration
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            layout: config.status_table.clone(),
            tracked: config.tracked_set(),
            closed: config.closed_set(),
        }
    }

    /// First table whose headers are a superset of the required headers
    pub fn find_table<'a>(&self, tables: &'a [TableData]) -> Option<&'a TableData> {
        tables.iter().find(|table| {
            self.layout
                .required_headers
                .iter()
                .all(|required| table.headers.iter().any(|h| h == required))
        })
    }

    /// Zip body rows with the headers by position
    pub fn status_rows(&self, table: &TableData) -> Vec<StatusRow> {
        let column = |name: &str| table.headers.iter().position(|h| h == name);
        let district = column(&self.layout.district_column);
        let company = column(&self.layout.company_column);
        let status = column(&self.layout.status_column);

        let cell = |row: &Vec<String>, idx: Option<usize>| {
            idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
        };

        table
            .rows
            .iter()
            .map(|row| StatusRow {
                district: cell(row, district),
                company_name: cell(row, company),
                status: cell(row, status),
            })
            .collect()
    }

    /// Fold status rows into district fields and an overall status
    pub fn fold(&self, rows: Vec<StatusRow>) -> StatusOutcome {
        let mut district_fields = BTreeMap::new();
        let mut open = rows.is_empty();

        for row in &rows {
            let key = row.district.trim().to_lowercase();
            if self.tracked.contains(&key) {
                district_fields.insert(key, row.status.clone());
            }
            if !self.closed.contains(&row.status) {
                open = true;
            }
        }

        StatusOutcome {
            district_fields,
            overall: if open {
                TicketStatus::Open
            } else {
                TicketStatus::Closed
            },
            rows,
        }
    }

    /// Locate the status table in the document and fold it.
    ///
    /// Fails with [`ExtractorError::StatusTableMissing`] when no table carries
    /// the required headers; the caller decides whether that is fatal.
    pub fn extract<D>(&self, doc: &D) -> Result<StatusOutcome, ExtractorError>
    where
        D: QueryDocument + ?Sized,
    {
        let tables = doc.tables();
        let Some(table) = self.find_table(&tables) else {
            warn!(
                tables = tables.len(),
                "No table carries the required status headers"
            );
            return Err(ExtractorError::StatusTableMissing(
                self.layout.required_headers.clone(),
            ));
        };

        let rows = self.status_rows(table);
        debug!(rows = rows.len(), "Read status table");
        Ok(self.fold(rows))
    }
}
