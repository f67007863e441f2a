//! Local cache of IoT IAM `AccessLogged` events.
//!
//! The binary keeps a SQLite cache in step with the chain; the library
//! exposes the coordinator so the cache can be read without network access.

mod bootstrap;
mod config;
pub mod error;
mod logger;
mod maintenance;
mod managers;
mod periodic_tasks;
mod runtime;
pub mod sync;

use std::sync::Arc;

pub use error::SyncError;
pub use sync::{CacheStats, SyncCoordinator, SyncSummary};

use crate::{bootstrap::AccessLogCoordinator, periodic_tasks::SyncTask};

pub async fn run() {
    let args = config::CliArgs::parse();
    let bootstrap::CoreBootstrap {
        config,
        coordinator,
    } = bootstrap::build_core(&args).await;

    display_banner(&config.environment);

    if let Some(action) = args.maintenance {
        if let Err(error) = maintenance::execute(coordinator.as_ref(), action).await {
            tracing::error!(error = %error, ?action, "Maintenance action failed");
            std::process::exit(1);
        }
        return;
    }

    log_cache_stats(&coordinator).await;

    let sync_task = config
        .sync
        .enabled
        .then(|| SyncTask::new(Arc::clone(&coordinator), &config.sync));

    runtime::run(sync_task).await;
}

async fn log_cache_stats(coordinator: &AccessLogCoordinator) {
    match coordinator.stats().await {
        Ok(stats) => tracing::info!(
            total_events = stats.total_events,
            distinct_devices = stats.distinct_devices,
            last_synced_block = ?stats.watermark.map(|w| w.last_synced_block),
            "Access log cache loaded"
        ),
        Err(error) => tracing::warn!(error = %error, "Failed to read access log cache stats"),
    }
}

fn display_banner(environment: &str) {
    tracing::info!("======================================================");
    tracing::info!("          IoT IAM access log sync v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("======================================================");
    tracing::info!("Running in {} environment", environment);
}
