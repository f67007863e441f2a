use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use iam_blockchain::RemoteEventSource;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::runner::run_with_shutdown;
use crate::sync::SyncCoordinator;

const TASK_NAME: &str = "access_log_sync";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct SyncConfig {
    pub enabled: bool,
    /// Pause between the end of one cycle and the start of the next.
    pub interval_secs: u64,
    /// First block scanned when the cache has no watermark.
    pub genesis_block: u64,
}

impl SyncConfig {
    pub(crate) fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Runs a sync cycle every `interval_secs` until shutdown.
pub(crate) struct SyncTask<S> {
    coordinator: Arc<SyncCoordinator<S>>,
    interval: Duration,
}

impl<S: RemoteEventSource> SyncTask<S> {
    pub(crate) fn new(coordinator: Arc<SyncCoordinator<S>>, config: &SyncConfig) -> Self {
        Self {
            coordinator,
            interval: config.interval(),
        }
    }

    pub(crate) async fn run(self, shutdown: CancellationToken) {
        run_with_shutdown(TASK_NAME, shutdown.clone(), || self.execute(&shutdown)).await;
    }

    #[tracing::instrument(name = "periodic_tasks.access_log_sync", skip_all)]
    async fn execute(&self, shutdown: &CancellationToken) -> Duration {
        let started = Instant::now();

        let status = match self.coordinator.sync_with_cancellation(shutdown).await {
            Ok(summary) if summary.inserted_count > 0 => {
                tracing::info!(
                    from_block = summary.from_block,
                    to_block = summary.to_block,
                    inserted = summary.inserted_count,
                    "New access log events cached"
                );
                "ok"
            }
            Ok(_) => "ok",
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    retry_in_secs = self.interval.as_secs(),
                    "Access log sync failed"
                );
                error.as_label()
            }
        };

        iam_observability::record_task_run(TASK_NAME, status, started.elapsed());
        self.interval
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use iam_blockchain::{FetcherConfig, RangeFetcher, testing::ScriptedEventSource};
    use iam_domain::{Address, B256, EventRecord};
    use iam_repository::{RepositoryManager, RepositoryManagerConfig};
    use tempfile::TempDir;

    use super::*;

    fn event(block_number: u64) -> EventRecord {
        EventRecord {
            device_id: Address::repeat_byte(7),
            reason: "badge accepted".to_string(),
            success: true,
            timestamp: 1_700_000_000,
            block_number,
            log_index: 0,
            tx_hash: B256::repeat_byte(block_number as u8),
        }
    }

    #[tokio::test]
    async fn task_syncs_and_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        let repository = RepositoryManager::connect(&RepositoryManagerConfig {
            database_path: dir.path().join("access_log.sqlite"),
            max_connections: 2,
            min_connections: 1,
        })
        .await
        .unwrap();
        let source = ScriptedEventSource::new(40).with_events([event(3), event(39)]);
        let coordinator = Arc::new(SyncCoordinator::new(
            RangeFetcher::new(source, FetcherConfig::default()),
            &repository,
            0,
        ));
        let config = SyncConfig {
            enabled: true,
            interval_secs: 60,
            genesis_block: 0,
        };

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            SyncTask::new(Arc::clone(&coordinator), &config).run(shutdown.clone()),
        );

        let mut watermark = None;
        for _ in 0..100 {
            watermark = coordinator.watermark().await.unwrap();
            if watermark.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(watermark.unwrap().last_synced_block, 40);
        assert_eq!(coordinator.stats().await.unwrap().total_events, 2);
    }
}
