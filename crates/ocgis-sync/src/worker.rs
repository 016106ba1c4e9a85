//! Background worker for scheduled sync runs

use crate::{SyncError, SyncMetrics, SyncOrchestrator};
use ocgis_domain::traits::{FeatureStore, NoticeSource};
use std::fmt::Display;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Background worker that runs the sync pipeline on a schedule
///
/// # Examples
///
/// ```no_run
/// use ocgis_extractor::{ExtractorConfig, TicketRecordBuilder};
/// use ocgis_store::{FeatureLayerClient, StoreConfig};
/// use ocgis_sync::{SyncConfig, SyncOrchestrator, SyncWorker};
/// # use ocgis_domain::{traits::NoticeSource, RawNotice};
/// # struct Inbox;
/// # impl NoticeSource for Inbox {
/// #     type Error = String;
/// #     fn fetch_notices(&self) -> Result<Vec<RawNotice>, String> { Ok(Vec::new()) }
/// # }
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FeatureLayerClient::new(StoreConfig::default())?;
///     let builder = TicketRecordBuilder::new(&ExtractorConfig::default())?;
///     let orchestrator =
///         SyncOrchestrator::new(Arc::new(Inbox), Arc::new(store), builder, SyncConfig::default())?;
///     let mut worker = SyncWorker::new(orchestrator);
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run().await?;
///     Ok(())
/// }
/// ```
pub struct SyncWorker<N, S> {
    orchestrator: SyncOrchestrator<N, S>,
    interval: Duration,
}

impl<N, S> SyncWorker<N, S>
where
    N: NoticeSource + Send + Sync + 'static,
    N::Error: Display,
    S: FeatureStore + Send + Sync + 'static,
    S::Error: Display,
{
    /// Create a worker that runs at the orchestrator's configured interval
    pub fn new(orchestrator: SyncOrchestrator<N, S>) -> Self {
        let interval = orchestrator.config().interval();
        Self {
            orchestrator,
            interval,
        }
    }

    /// Override the interval between runs
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Interval between runs
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    ///
    /// A failed run is logged and the schedule continues.
    pub async fn run(&mut self) -> Result<(), SyncError> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Sync worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting sync run");

                    match self.orchestrator.run().await {
                        Ok(report) => {
                            tracing::info!(
                                "Run completed: {} records, {} edits, {} failures",
                                report.processed.len(),
                                report.reconciliation.changes.len(),
                                report.failures.len() + report.reconciliation.failures.len()
                            );
                        }
                        Err(e) => {
                            tracing::error!("Run failed: {}", e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping sync worker");
                    break;
                }
            }
        }

        tracing::info!("Sync worker stopped. Final metrics:\n{}", self.metrics().summary());

        Ok(())
    }

    /// Run for a specific number of cycles, stopping at the first failure
    pub async fn run_cycles(&mut self, cycles: usize) -> Result<(), SyncError> {
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Sync worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting sync run {}/{}", cycle + 1, cycles);

            match self.orchestrator.run().await {
                Ok(report) => {
                    tracing::info!(
                        "Run {}/{} completed: {} records, {} edits",
                        cycle + 1,
                        cycles,
                        report.processed.len(),
                        report.reconciliation.changes.len()
                    );
                }
                Err(e) => {
                    tracing::error!("Run {}/{} failed: {}", cycle + 1, cycles, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Sync worker finished {} cycles. Final metrics:\n{}",
            cycles,
            self.metrics().summary()
        );

        Ok(())
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &SyncMetrics {
        self.orchestrator.metrics()
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&mut self) {
        self.orchestrator.reset_metrics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncConfig;
    use ocgis_domain::RawNotice;
    use ocgis_extractor::{ExtractorConfig, TicketRecordBuilder};
    use ocgis_store::MemoryFeatureStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const NOTICE: &str = r#"<html><body>
        <table><tr><td class="ticket-number">W-1</td></tr></table>
        <table>
          <tr><th>District</th><th>Company Name</th><th>Status</th></tr>
          <tr><td>North</td><td>Iowa Gas</td><td>Marked</td></tr>
        </table>
        </body></html>"#;

    // Fails every fetch after the first `healthy` ones
    struct FlakySource {
        calls: AtomicUsize,
        healthy: usize,
    }

    impl NoticeSource for FlakySource {
        type Error = String;

        fn fetch_notices(&self) -> Result<Vec<RawNotice>, String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy {
                return Err("site unavailable".to_string());
            }
            Ok(vec![RawNotice::new(0, "inbox#0", NOTICE)])
        }
    }

    fn worker(healthy: usize) -> (SyncWorker<FlakySource, MemoryFeatureStore>, MemoryFeatureStore) {
        let store = MemoryFeatureStore::new();
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
            healthy,
        });
        let builder = TicketRecordBuilder::new(&ExtractorConfig::default()).unwrap();
        let orchestrator = SyncOrchestrator::new(
            source,
            Arc::new(store.clone()),
            builder,
            SyncConfig::default(),
        )
        .unwrap();
        let worker = SyncWorker::new(orchestrator).with_interval(Duration::from_millis(5));
        (worker, store)
    }

    #[test]
    fn test_interval_from_config() {
        let (worker, _) = worker(1);
        assert_eq!(worker.interval(), Duration::from_millis(5));

        let builder = TicketRecordBuilder::new(&ExtractorConfig::default()).unwrap();
        let orchestrator = SyncOrchestrator::new(
            Arc::new(FlakySource {
                calls: AtomicUsize::new(0),
                healthy: 0,
            }),
            Arc::new(MemoryFeatureStore::new()),
            builder,
            SyncConfig::lenient(),
        )
        .unwrap();
        assert_eq!(
            SyncWorker::new(orchestrator).interval(),
            Duration::from_secs(240 * 60)
        );
    }

    #[tokio::test]
    async fn test_run_cycles() {
        let (mut worker, store) = worker(3);

        worker.run_cycles(2).await.unwrap();

        assert_eq!(worker.metrics().run_count, 2);
        // Added on the first run, updated on the second
        assert_eq!(worker.metrics().added, 1);
        assert_eq!(worker.metrics().updated, 1);
        assert_eq!(store.submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_run_cycles_stops_on_failure() {
        let (mut worker, _) = worker(1);

        let err = worker.run_cycles(3).await.unwrap_err();

        assert!(matches!(err, SyncError::Fetch(_)));
        assert_eq!(worker.metrics().run_count, 1);
        assert_eq!(worker.metrics().failed_runs, 1);
    }

    #[tokio::test]
    async fn test_reset_metrics() {
        let (mut worker, _) = worker(1);

        worker.run_cycles(1).await.unwrap();
        assert_eq!(worker.metrics().run_count, 1);

        worker.reset_metrics();
        assert_eq!(worker.metrics().run_count, 0);
    }
}
