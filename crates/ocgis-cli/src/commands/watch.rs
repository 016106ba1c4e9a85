//! Watch command implementation.

use crate::cli::WatchArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use crate::source::DirectoryNoticeSource;
use ocgis_extractor::TicketRecordBuilder;
use ocgis_store::FeatureLayerClient;
use ocgis_sync::{SyncOrchestrator, SyncWorker};
use std::sync::Arc;

/// Execute the watch command.
pub async fn execute_watch(args: WatchArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let source = Arc::new(DirectoryNoticeSource::from_config(
        &config.source,
        args.notices.as_deref(),
    ));
    let builder = TicketRecordBuilder::new(&config.extractor)?;
    let store = FeatureLayerClient::new(config.store.clone())?;

    let mut sync = config.sync.clone();
    sync.dry_run |= args.dry_run;
    if let Some(minutes) = args.interval {
        sync.interval_minutes = minutes;
    }
    let minutes = sync.interval_minutes;

    let orchestrator = SyncOrchestrator::new(source.clone(), Arc::new(store), builder, sync)?;
    let mut worker = SyncWorker::new(orchestrator);

    println!(
        "{}",
        formatter.info(&format!(
            "Watching {} every {} minute(s), Ctrl+C to stop",
            source.dir().display(),
            minutes
        ))
    );

    worker.run().await?;

    println!("{}", worker.metrics().summary());
    Ok(())
}
