//! Output formatting for the CLI.

use crate::commands::ExtractedNotice;
use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use ocgis_store::esri;
use ocgis_sync::RunReport;
use serde_json::{json, Value};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the outcome of a sync run.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&report_json(report))?),
            OutputFormat::Table => Ok(self.format_report_table(report)),
        }
    }

    /// Format extracted notices.
    pub fn format_notices(&self, notices: &[ExtractedNotice], diagnostics: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = notices.iter().map(notice_json).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Table => Ok(self.format_notices_table(notices, diagnostics)),
        }
    }

    fn format_report_table(&self, report: &RunReport) -> String {
        let reconciliation = &report.reconciliation;
        let changes = &reconciliation.changes;

        let mut builder = Builder::default();
        builder.push_record(["Step", "Count"]);
        builder.push_record(["Notices fetched".to_string(), report.fetched.to_string()]);
        builder.push_record(["Records built".to_string(), report.processed.len().to_string()]);
        builder.push_record(["Extraction failures".to_string(), report.failures.len().to_string()]);
        builder.push_record(["Duplicates".to_string(), reconciliation.duplicates.len().to_string()]);
        builder.push_record(["Lookup failures".to_string(), reconciliation.failures.len().to_string()]);
        builder.push_record(["Adds".to_string(), changes.adds.len().to_string()]);
        builder.push_record(["Updates".to_string(), changes.updates.len().to_string()]);
        builder.push_record(["Deletes".to_string(), changes.deletes.len().to_string()]);
        if let Some(open) = &report.open_after {
            builder.push_record(["Still open".to_string(), open.len().to_string()]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let mut lines = vec![table.to_string()];

        match &report.submitted {
            Some(submitted) => {
                lines.push(self.success(&format!(
                    "Submitted: {} added, {} updated, {} deleted",
                    submitted.added, submitted.updated, submitted.deleted
                )));
                for rejected in &submitted.rejected {
                    lines.push(self.error(&format!(
                        "Rejected {}: {}",
                        rejected.ticket_number.as_deref().unwrap_or("?"),
                        rejected.reason
                    )));
                }
            }
            None => lines.push(self.info("Dry run, nothing submitted")),
        }

        for failure in &report.failures {
            lines.push(self.error(&format!("{}: {}", failure.source, failure.reason)));
        }
        for failure in &reconciliation.failures {
            lines.push(self.error(&format!(
                "Lookup of {} failed: {}",
                failure.ticket_number, failure.reason
            )));
        }
        for duplicate in &reconciliation.duplicates {
            lines.push(self.warning(&format!(
                "Duplicate {} at position {} dropped",
                duplicate.ticket_number, duplicate.position
            )));
        }
        if report.timed_out {
            lines.push(self.warning(&format!(
                "Run timed out: {} notices skipped, {} tickets unresolved",
                report.skipped.len(),
                reconciliation.unresolved.len()
            )));
        }
        for warning in &report.warnings {
            lines.push(self.warning(warning));
        }

        lines.join("\n")
    }

    fn format_notices_table(&self, notices: &[ExtractedNotice], diagnostics: bool) -> String {
        if notices.is_empty() {
            return self.colorize("No notices found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Source", "Ticket", "Status", "Rings", "Points", "Fields"]);

        let mut notes = Vec::new();
        for notice in notices {
            match &notice.outcome {
                Ok(built) => {
                    let record = &built.record;
                    let geometry = record.geometry();
                    builder.push_record([
                        notice.source.clone(),
                        record.ticket_number().to_string(),
                        record.status().map(|s| s.as_str()).unwrap_or("-").to_string(),
                        geometry.rings.len().to_string(),
                        geometry.point_count().to_string(),
                        record.attributes().len().to_string(),
                    ]);
                    if diagnostics {
                        for diagnostic in &built.diagnostics {
                            notes.push(self.warning(&format!("{}: {}", notice.source, diagnostic)));
                        }
                    }
                }
                Err(e) => {
                    builder.push_record([
                        notice.source.clone(),
                        "-".to_string(),
                        "FAILED".to_string(),
                        String::new(),
                        String::new(),
                        String::new(),
                    ]);
                    notes.push(self.error(&format!("{}: {}", notice.source, e)));
                }
            }
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let mut lines = vec![table.to_string()];
        lines.extend(notes);
        lines.join("\n")
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn report_json(report: &RunReport) -> Value {
    let reconciliation = &report.reconciliation;
    let changes = &reconciliation.changes;

    json!({
        "fetched": report.fetched,
        "processed": report.processed,
        "failures": report.failures.iter().map(|f| json!({
            "sequence": f.sequence,
            "source": f.source,
            "reason": f.reason,
        })).collect::<Vec<_>>(),
        "skipped": report.skipped,
        "duplicates": reconciliation.duplicates.iter().map(|d| json!({
            "ticket_number": d.ticket_number,
            "position": d.position,
        })).collect::<Vec<_>>(),
        "lookup_failures": reconciliation.failures.iter().map(|f| json!({
            "ticket_number": f.ticket_number,
            "reason": f.reason,
        })).collect::<Vec<_>>(),
        "unresolved": reconciliation.unresolved,
        "adds": changes.adds.iter().map(|r| r.ticket_number()).collect::<Vec<_>>(),
        "updates": changes.updates.iter().map(|u| json!({
            "ticket_number": u.record.ticket_number(),
            "object_id": u.object_id,
        })).collect::<Vec<_>>(),
        "deletes": changes.deletes.iter().map(|d| json!({
            "ticket_number": d.ticket_number,
            "object_id": d.object_id,
        })).collect::<Vec<_>>(),
        "submitted": report.submitted.as_ref().map(|s| json!({
            "added": s.added,
            "updated": s.updated,
            "deleted": s.deleted,
            "rejected": s.rejected.iter().map(|r| json!({
                "ticket_number": r.ticket_number,
                "object_id": r.object_id,
                "reason": r.reason,
            })).collect::<Vec<_>>(),
        })),
        "open_after": report.open_after.as_ref().map(|open| {
            open.iter().map(|t| t.ticket_number.as_str()).collect::<Vec<_>>()
        }),
        "timed_out": report.timed_out,
        "warnings": report.warnings,
        "elapsed_ms": report.elapsed.as_millis() as u64,
    })
}

fn notice_json(notice: &ExtractedNotice) -> Value {
    match &notice.outcome {
        Ok(built) => json!({
            "source": notice.source,
            "attributes": built.record.attributes(),
            "geometry": esri::geometry_json(built.record.geometry()),
            "diagnostics": built.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        }),
        Err(e) => json!({
            "source": notice.source,
            "error": e.to_string(),
        }),
    }
}
