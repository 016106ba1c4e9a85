//! One sync run: fetch, extract, reconcile, submit

use crate::config::{StaleTicketPolicy, SyncConfig};
use crate::error::SyncError;
use crate::metrics::SyncMetrics;
use crate::reconciler::{ReconciliationResult, Reconciler};
use ocgis_domain::traits::{FeatureStore, NoticeSource};
use ocgis_domain::{RawNotice, RemoteTicket, SubmitResult};
use ocgis_extractor::{BuiltTicket, Diagnostic, TicketRecordBuilder};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// A notice that could not be turned into a record
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFailure {
    /// Sequence number of the notice
    pub sequence: usize,
    /// Where the notice came from
    pub source: String,
    /// Why extraction failed
    pub reason: String,
}

/// A diagnostic attached to one built record
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeDiagnostic {
    /// Sequence number of the notice
    pub sequence: usize,
    /// Ticket number of the record
    pub ticket_number: String,
    /// What extraction noticed
    pub diagnostic: Diagnostic,
}

/// Everything one run did
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Notices fetched
    pub fetched: usize,

    /// Ticket numbers of built records, in sequence order (repeats included)
    pub processed: Vec<String>,

    /// Non-fatal extraction diagnostics
    pub diagnostics: Vec<NoticeDiagnostic>,

    /// Notices that failed extraction
    pub failures: Vec<DocumentFailure>,

    /// Notices never extracted because the run timed out (sources)
    pub skipped: Vec<String>,

    /// Reconciliation outcome, including the change set
    pub reconciliation: ReconciliationResult,

    /// Submission outcome; `None` on dry runs
    pub submitted: Option<SubmitResult>,

    /// Tickets the store still marks OPEN after submission
    pub open_after: Option<Vec<RemoteTicket>>,

    /// Whether the run timeout cut the run short
    pub timed_out: bool,

    /// Steps that were skipped or failed without aborting the run
    pub warnings: Vec<String>,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunReport {
    /// Sources of every notice without a record
    pub fn unprocessed_sources(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| f.source.clone())
            .chain(self.skipped.iter().cloned())
            .collect()
    }
}

struct Extraction {
    built: Vec<(usize, BuiltTicket)>,
    failures: Vec<DocumentFailure>,
    skipped: Vec<String>,
    timed_out: bool,
}

/// Drives sync runs against a notice source and a feature store
///
/// # Examples
///
/// ```no_run
/// use ocgis_extractor::{ExtractorConfig, TicketRecordBuilder};
/// use ocgis_store::MemoryFeatureStore;
/// use ocgis_sync::{SyncConfig, SyncOrchestrator};
/// # use ocgis_domain::{traits::NoticeSource, RawNotice};
/// # struct Inbox;
/// # impl NoticeSource for Inbox {
/// #     type Error = String;
/// #     fn fetch_notices(&self) -> Result<Vec<RawNotice>, String> { Ok(Vec::new()) }
/// # }
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let builder = TicketRecordBuilder::new(&ExtractorConfig::default())?;
/// let mut orchestrator = SyncOrchestrator::new(
///     Arc::new(Inbox),
///     Arc::new(MemoryFeatureStore::new()),
///     builder,
///     SyncConfig::default(),
/// )?;
///
/// let report = orchestrator.run().await?;
/// println!("{} records, {} edits", report.processed.len(), report.reconciliation.changes.len());
/// # Ok(())
/// # }
/// ```
pub struct SyncOrchestrator<N, S> {
    source: Arc<N>,
    store: Arc<S>,
    builder: Arc<TicketRecordBuilder>,
    reconciler: Reconciler,
    config: SyncConfig,
    metrics: SyncMetrics,
}

impl<N, S> SyncOrchestrator<N, S>
where
    N: NoticeSource + Send + Sync + 'static,
    N::Error: Display,
    S: FeatureStore + Send + Sync + 'static,
    S::Error: Display,
{
    /// Create an orchestrator with the given configuration
    pub fn new(
        source: Arc<N>,
        store: Arc<S>,
        builder: TicketRecordBuilder,
        config: SyncConfig,
    ) -> Result<Self, SyncError> {
        config.validate().map_err(SyncError::Config)?;
        Ok(Self {
            source,
            store,
            builder: Arc::new(builder),
            reconciler: Reconciler::from_config(&config),
            config,
            metrics: SyncMetrics::new(),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Perform one complete run
    ///
    /// Document-level problems are isolated and reported; only an unreadable
    /// source or a refused submission fails the run.
    pub async fn run(&mut self) -> Result<RunReport, SyncError> {
        let result = self.run_once().await;
        match &result {
            Ok(report) => self.metrics.record_run(report),
            Err(e) => {
                error!("Run failed: {}", e);
                self.metrics.record_failure();
            }
        }
        result
    }

    async fn run_once(&self) -> Result<RunReport, SyncError> {
        let started = Instant::now();
        let deadline = started + self.config.run_timeout();
        info!(dry_run = self.config.dry_run, "Start run");

        let notices = self.fetch(deadline).await?;
        let mut report = RunReport {
            fetched: notices.len(),
            ..Default::default()
        };
        info!(notices = notices.len(), "Fetched notices");

        let extraction = self.extract_all(notices, deadline).await;
        report.failures = extraction.failures;
        report.skipped = extraction.skipped;
        report.timed_out = extraction.timed_out;

        let mut records = Vec::with_capacity(extraction.built.len());
        for (sequence, built) in extraction.built {
            let ticket_number = built.record.ticket_number().to_string();
            report.diagnostics.extend(built.diagnostics.into_iter().map(|diagnostic| {
                NoticeDiagnostic {
                    sequence,
                    ticket_number: ticket_number.clone(),
                    diagnostic,
                }
            }));
            report.processed.push(ticket_number);
            records.push(built.record);
        }
        info!(
            built = records.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "Extracted notices"
        );

        let mut reconciliation = self
            .reconciler
            .reconcile(records, Arc::clone(&self.store), Some(deadline))
            .await;
        report.timed_out |= reconciliation.timed_out();

        if self.config.stale_ticket_policy == StaleTicketPolicy::Delete {
            self.detect_stale(&mut report, &mut reconciliation).await;
        }
        report.reconciliation = reconciliation;

        let changes = &report.reconciliation.changes;
        if self.config.dry_run {
            info!(
                "DRY RUN: Would submit {} adds, {} updates, {} deletes",
                changes.adds.len(),
                changes.updates.len(),
                changes.deletes.len()
            );
        } else {
            report.submitted = Some(self.submit(&report).await?);

            if self.config.requery_open {
                match self.query_open().await {
                    Ok(open) => {
                        info!(open = open.len(), "Tickets still open in store");
                        report.open_after = Some(open);
                    }
                    Err(e) => {
                        warn!("Open-ticket query failed: {}", e);
                        report.warnings.push(format!("open-ticket query failed: {}", e));
                    }
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            elapsed_ms = report.elapsed.as_millis() as u64,
            timed_out = report.timed_out,
            adds = report.reconciliation.changes.adds.len(),
            updates = report.reconciliation.changes.updates.len(),
            deletes = report.reconciliation.changes.deletes.len(),
            "End run"
        );
        Ok(report)
    }

    async fn fetch(&self, deadline: Instant) -> Result<Vec<RawNotice>, SyncError> {
        let source = Arc::clone(&self.source);
        let task =
            tokio::task::spawn_blocking(move || source.fetch_notices().map_err(|e| e.to_string()));

        match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(Ok(notices))) => Ok(notices),
            Ok(Ok(Err(e))) => Err(SyncError::Fetch(e)),
            Ok(Err(e)) => Err(SyncError::Worker(format!("fetch task failed: {}", e))),
            Err(_) => Err(SyncError::Fetch("timed out fetching notices".to_string())),
        }
    }

    /// Build records with bounded parallelism; results come back in sequence order
    async fn extract_all(&self, notices: Vec<RawNotice>, deadline: Instant) -> Extraction {
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let mut pending: BTreeMap<usize, String> = BTreeMap::new();
        let mut set = JoinSet::new();

        for notice in notices {
            pending.insert(notice.sequence, notice.source.clone());
            let semaphore = Arc::clone(&semaphore);
            let builder = Arc::clone(&self.builder);

            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                if Instant::now() >= deadline {
                    return None;
                }
                let RawNotice {
                    sequence,
                    source,
                    content,
                } = notice;
                let outcome = tokio::task::spawn_blocking(move || builder.build(&content)).await;
                Some((sequence, source, outcome))
            });
        }

        let mut built = Vec::new();
        let mut failures = Vec::new();
        let mut timed_out = false;

        loop {
            let next = match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(pending = set.len(), "Run deadline reached, abandoning extraction");
                    set.abort_all();
                    timed_out = true;
                    break;
                }
            };
            let Some(joined) = next else {
                break;
            };

            match joined {
                Ok(Some((sequence, source, outcome))) => {
                    pending.remove(&sequence);
                    match outcome {
                        Ok(Ok(ticket)) => {
                            debug!(sequence, ticket = ticket.record.ticket_number(), "Notice extracted");
                            built.push((sequence, ticket));
                        }
                        Ok(Err(e)) => {
                            warn!(sequence, source = %source, "Notice rejected: {}", e);
                            failures.push(DocumentFailure {
                                sequence,
                                source,
                                reason: e.to_string(),
                            });
                        }
                        Err(e) => {
                            error!(sequence, source = %source, "Extraction task failed: {}", e);
                            failures.push(DocumentFailure {
                                sequence,
                                source,
                                reason: format!("extraction task failed: {}", e),
                            });
                        }
                    }
                }
                Ok(None) => timed_out = true,
                Err(e) if e.is_cancelled() => {}
                Err(e) => error!("Extraction task panicked: {}", e),
            }
        }

        built.sort_by_key(|(sequence, _)| *sequence);
        failures.sort_by_key(|f| f.sequence);

        Extraction {
            built,
            failures,
            skipped: pending.into_values().collect(),
            timed_out,
        }
    }

    /// Fill `deletes` with store tickets that are OPEN but absent from this batch
    async fn detect_stale(&self, report: &mut RunReport, reconciliation: &mut ReconciliationResult) {
        // An incomplete batch would make unread tickets look stale
        if report.timed_out || !report.failures.is_empty() {
            warn!("Skipping stale-ticket detection: batch is incomplete");
            report
                .warnings
                .push("stale-ticket detection skipped: batch is incomplete".to_string());
            return;
        }

        match self.query_open().await {
            Ok(open) => {
                let present: HashSet<String> = report.processed.iter().cloned().collect();
                reconciliation.changes.deletes = Reconciler::stale_tickets(&open, &present);
                info!(
                    open = open.len(),
                    stale = reconciliation.changes.deletes.len(),
                    "Detected stale tickets"
                );
            }
            Err(e) => {
                warn!("Open-ticket query failed, no deletes this run: {}", e);
                report
                    .warnings
                    .push(format!("stale-ticket detection failed: {}", e));
            }
        }
    }

    async fn query_open(&self) -> Result<Vec<RemoteTicket>, String> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.query_open().map_err(|e| e.to_string()))
            .await
            .map_err(|e| format!("query task failed: {}", e))?
    }

    async fn submit(&self, report: &RunReport) -> Result<SubmitResult, SyncError> {
        let changes = report.reconciliation.changes.clone();
        if changes.is_empty() {
            debug!("Nothing to submit");
            return Ok(SubmitResult::default());
        }

        let store = Arc::clone(&self.store);
        let outcome =
            tokio::task::spawn_blocking(move || store.submit(&changes).map_err(|e| e.to_string()))
                .await
                .map_err(|e| SyncError::Worker(format!("submit task failed: {}", e)))?;

        match outcome {
            Ok(result) => {
                for failure in &result.rejected {
                    warn!(
                        ticket = failure.ticket_number.as_deref().unwrap_or("?"),
                        object_id = failure.object_id,
                        "Edit rejected: {}",
                        failure.reason
                    );
                }
                info!(
                    added = result.added,
                    updated = result.updated,
                    deleted = result.deleted,
                    rejected = result.rejected.len(),
                    "Submitted changes"
                );
                Ok(result)
            }
            Err(reason) => Err(SyncError::Submit {
                reason,
                processed: report.processed.clone(),
                skipped: report.unprocessed_sources(),
            }),
        }
    }
}
