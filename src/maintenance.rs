use std::io::{self, Write};

use iam_blockchain::RemoteEventSource;
use iam_repository::RepositoryError;
use thiserror::Error;

use crate::{
    config::MaintenanceAction,
    sync::{CacheStats, SyncCoordinator},
};

#[derive(Error, Debug)]
pub(crate) enum MaintenanceError {
    #[error("Cache store error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Failed to write cache stats: {0}")]
    Output(#[from] serde_json::Error),
}

/// Run a one-shot maintenance action against the cache.
///
/// `Stats` is written to stdout as JSON; the other actions only log.
pub(crate) async fn execute<S: RemoteEventSource>(
    coordinator: &SyncCoordinator<S>,
    action: MaintenanceAction,
) -> Result<(), MaintenanceError> {
    match action {
        MaintenanceAction::Stats => {
            let stats = coordinator.stats().await?;
            write_stats(&stats, io::stdout().lock())?;
        }
        MaintenanceAction::ClearCache => {
            coordinator.clear_cache().await?;
        }
        MaintenanceAction::ResetWatermark(block) => {
            coordinator.reset_watermark(block).await?;
        }
    }
    Ok(())
}

fn write_stats<W: Write>(stats: &CacheStats, mut out: W) -> Result<(), MaintenanceError> {
    serde_json::to_writer_pretty(&mut out, stats)?;
    writeln!(out).map_err(serde_json::Error::io)?;
    Ok(())
}
