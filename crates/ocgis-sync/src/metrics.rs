//! Metrics collection for sync runs

use crate::orchestrator::RunReport;

/// Totals accumulated over the runs of one orchestrator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncMetrics {
    /// Runs completed (including dry runs)
    pub run_count: usize,

    /// Runs that ended with a run-level error
    pub failed_runs: usize,

    /// Runs cut short by the run timeout
    pub timed_out_runs: usize,

    /// Notices fetched
    pub notices: usize,

    /// Notices turned into records
    pub records_built: usize,

    /// Notices that failed extraction
    pub extraction_failures: usize,

    /// Repeated ticket numbers dropped
    pub duplicates: usize,

    /// Lookups that failed
    pub lookup_failures: usize,

    /// Features added
    pub added: usize,

    /// Features updated
    pub updated: usize,

    /// Features deleted
    pub deleted: usize,

    /// Edits the store rejected
    pub rejected: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u128,
}

impl SyncMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finished run into the totals
    pub fn record_run(&mut self, report: &RunReport) {
        self.run_count += 1;
        if report.timed_out {
            self.timed_out_runs += 1;
        }
        self.notices += report.fetched;
        self.records_built += report.processed.len();
        self.extraction_failures += report.failures.len();
        self.duplicates += report.reconciliation.duplicates.len();
        self.lookup_failures += report.reconciliation.failures.len();
        if let Some(submitted) = &report.submitted {
            self.added += submitted.added;
            self.updated += submitted.updated;
            self.deleted += submitted.deleted;
            self.rejected += submitted.rejected.len();
        }
        self.total_runtime_ms += report.elapsed.as_millis();
    }

    /// Record a run that ended with an error
    pub fn record_failure(&mut self) {
        self.failed_runs += 1;
    }

    /// Get total edits applied
    pub fn total_applied(&self) -> usize {
        self.added + self.updated + self.deleted
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Sync Metrics Summary".to_string(),
            "====================".to_string(),
            format!("Runs: {} ({} failed, {} timed out)", self.run_count, self.failed_runs, self.timed_out_runs),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
            format!("Notices fetched: {}", self.notices),
            format!("Records built: {}", self.records_built),
        ];

        if self.extraction_failures > 0 {
            lines.push(format!("Extraction failures: {}", self.extraction_failures));
        }
        if self.duplicates > 0 {
            lines.push(format!("Duplicates dropped: {}", self.duplicates));
        }
        if self.lookup_failures > 0 {
            lines.push(format!("Lookup failures: {}", self.lookup_failures));
        }

        lines.push(String::new());
        lines.push(format!("Added: {}", self.added));
        lines.push(format!("Updated: {}", self.updated));
        lines.push(format!("Deleted: {}", self.deleted));
        if self.rejected > 0 {
            lines.push(format!("Rejected: {}", self.rejected));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::{Duplicate, ReconciliationResult};
    use ocgis_domain::SubmitResult;
    use std::time::Duration;

    fn report() -> RunReport {
        RunReport {
            fetched: 5,
            processed: vec!["A".into(), "B".into(), "C".into(), "A".into()],
            reconciliation: ReconciliationResult {
                duplicates: vec![Duplicate {
                    ticket_number: "A".into(),
                    position: 3,
                }],
                ..Default::default()
            },
            submitted: Some(SubmitResult {
                added: 2,
                updated: 1,
                deleted: 0,
                rejected: Vec::new(),
            }),
            elapsed: Duration::from_millis(40),
            ..Default::default()
        }
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = SyncMetrics::new();
        assert_eq!(metrics.run_count, 0);
        assert_eq!(metrics.total_applied(), 0);
    }

    #[test]
    fn test_record_run() {
        let mut metrics = SyncMetrics::new();
        metrics.record_run(&report());
        metrics.record_run(&report());
        metrics.record_failure();

        assert_eq!(metrics.run_count, 2);
        assert_eq!(metrics.failed_runs, 1);
        assert_eq!(metrics.notices, 10);
        assert_eq!(metrics.records_built, 8);
        assert_eq!(metrics.duplicates, 2);
        assert_eq!(metrics.total_applied(), 6);
        assert_eq!(metrics.total_runtime_ms, 80);
    }

    #[test]
    fn test_reset() {
        let mut metrics = SyncMetrics::new();
        metrics.record_run(&report());
        metrics.reset();
        assert_eq!(metrics, SyncMetrics::default());
    }

    #[test]
    fn test_summary() {
        let mut metrics = SyncMetrics::new();
        metrics.record_run(&report());

        let summary = metrics.summary();
        assert!(summary.contains("Runs: 1 (0 failed, 0 timed out)"));
        assert!(summary.contains("Total runtime: 40ms"));
        assert!(summary.contains("Added: 2"));
        assert!(summary.contains("Duplicates dropped: 1"));
        assert!(!summary.contains("Lookup failures"));
    }
}
