//! Run command implementation.

use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use crate::source::DirectoryNoticeSource;
use ocgis_domain::traits::{FeatureStore, NoticeSource};
use ocgis_extractor::TicketRecordBuilder;
use ocgis_store::{FeatureLayerClient, MemoryFeatureStore};
use ocgis_sync::{RunReport, SyncOrchestrator};
use std::fmt::Display;
use std::sync::Arc;

/// Execute the run command.
pub async fn execute_run(args: RunArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let source = Arc::new(DirectoryNoticeSource::from_config(
        &config.source,
        args.notices.as_deref(),
    ));
    let builder = TicketRecordBuilder::new(&config.extractor)?;
    let mut sync = config.sync.clone();
    sync.dry_run |= args.dry_run;

    tracing::info!(dir = %source.dir().display(), dry_run = sync.dry_run, "Reading notices");

    let report = if args.memory {
        run_once(source, Arc::new(MemoryFeatureStore::new()), builder, sync).await?
    } else {
        let store = FeatureLayerClient::new(config.store.clone())?;
        run_once(source, Arc::new(store), builder, sync).await?
    };

    println!("{}", formatter.format_report(&report)?);
    Ok(())
}

/// Perform a single sync run against any store.
pub async fn run_once<N, S>(
    source: Arc<N>,
    store: Arc<S>,
    builder: TicketRecordBuilder,
    sync: ocgis_sync::SyncConfig,
) -> Result<RunReport>
where
    N: NoticeSource + Send + Sync + 'static,
    N::Error: Display,
    S: FeatureStore + Send + Sync + 'static,
    S::Error: Display,
{
    let mut orchestrator = SyncOrchestrator::new(source, store, builder, sync)?;
    let report = orchestrator.run().await?;
    tracing::info!("{}", orchestrator.metrics().summary());
    Ok(report)
}
