use std::time::Instant;

use chrono::{SubsecRound, Utc};
use iam_blockchain::{RangeFetcher, RemoteEventSource};
use iam_domain::{Address, BlockTarget, EventRecord, SyncWatermark};
use iam_repository::{
    AccessLogRepository, ClearedCache, PageRequest, RepositoryError, RepositoryManager,
    SyncWatermarkRepository,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::SyncError;

/// Result of one committed sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub from_block: u64,
    /// Resolved head; below `from_block` when the cache was already current.
    pub to_block: u64,
    pub fetched_count: usize,
    pub inserted_count: u64,
    pub new_watermark: Option<SyncWatermark>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_events: u64,
    pub distinct_devices: u64,
    pub watermark: Option<SyncWatermark>,
}

/// Brings the local access-log cache up to date with the chain.
///
/// The coordinator is the only writer of the cache. `sync` and the
/// maintenance operations are serialized through one async mutex; reads take
/// no lock and only see committed rows.
pub struct SyncCoordinator<S> {
    fetcher: RangeFetcher<S>,
    access_log_repository: AccessLogRepository,
    sync_watermark_repository: SyncWatermarkRepository,
    genesis_block: u64,
    sync_lock: Mutex<()>,
}

impl<S: RemoteEventSource> SyncCoordinator<S> {
    pub fn new(
        fetcher: RangeFetcher<S>,
        repository_manager: &RepositoryManager,
        genesis_block: u64,
    ) -> Self {
        Self {
            fetcher,
            access_log_repository: repository_manager.access_log_repository(),
            sync_watermark_repository: repository_manager.sync_watermark_repository(),
            genesis_block,
            sync_lock: Mutex::new(()),
        }
    }

    pub async fn sync(&self) -> Result<SyncSummary, SyncError> {
        self.sync_with_cancellation(&CancellationToken::new()).await
    }

    /// Fetch everything after the watermark up to the confirmed head and
    /// commit it together with the new watermark.
    ///
    /// On any error nothing is committed. `cancel` is honoured between
    /// fetched sub-ranges.
    #[tracing::instrument(
        name = "sync.cycle",
        skip_all,
        fields(
            from_block = tracing::field::Empty,
            to_block = tracing::field::Empty,
        )
    )]
    pub async fn sync_with_cancellation(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary, SyncError> {
        let _guard = self.sync_lock.lock().await;
        let started = Instant::now();

        let result = self.run_cycle(cancel).await;
        match &result {
            Ok(summary) => {
                iam_observability::record_sync_cycle(
                    "ok",
                    started.elapsed(),
                    summary
                        .to_block
                        .saturating_add(1)
                        .saturating_sub(summary.from_block),
                    summary.fetched_count,
                    summary.inserted_count,
                );
                if let Some(watermark) = &summary.new_watermark {
                    iam_observability::record_sync_watermark(watermark.last_synced_block);
                }
            }
            Err(error) => {
                iam_observability::record_sync_cycle(
                    error.as_label(),
                    started.elapsed(),
                    0,
                    0,
                    0,
                );
            }
        }
        result
    }

    async fn run_cycle(&self, cancel: &CancellationToken) -> Result<SyncSummary, SyncError> {
        let watermark = self.sync_watermark_repository.get().await?;
        let from_block = watermark.map_or(self.genesis_block, |w| w.next_block());
        tracing::Span::current().record("from_block", from_block);

        let outcome = self
            .fetcher
            .fetch(from_block, BlockTarget::Latest, cancel)
            .await
            .inspect_err(|error| {
                tracing::warn!(
                    from_block,
                    last_completed_block = ?error.last_completed_block(),
                    error = %error,
                    "Sync fetch failed; watermark left unchanged"
                );
            })?;
        let to_block = outcome.range.to;
        tracing::Span::current().record("to_block", to_block);

        if outcome.range.is_empty() {
            tracing::debug!(from_block, head = to_block, "Cache already at chain head");
            return Ok(SyncSummary {
                from_block,
                to_block,
                fetched_count: 0,
                inserted_count: 0,
                new_watermark: watermark,
            });
        }

        // The store keeps whole seconds; the summary reports what was persisted.
        let last_sync_time = Utc::now().trunc_subsecs(0);
        let inserted_count = self
            .access_log_repository
            .commit_sync_batch(&outcome.events, to_block, last_sync_time)
            .await?;

        let summary = SyncSummary {
            from_block,
            to_block,
            fetched_count: outcome.events.len(),
            inserted_count,
            new_watermark: Some(SyncWatermark {
                last_synced_block: to_block,
                last_sync_time,
            }),
        };
        tracing::info!(
            from_block,
            to_block,
            fetched = summary.fetched_count,
            inserted = summary.inserted_count,
            "Sync cycle committed"
        );
        Ok(summary)
    }

    /// Cached events, newest first. Never contacts the chain.
    pub async fn read(
        &self,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<EventRecord>, RepositoryError> {
        self.access_log_repository
            .query_page(PageRequest::new(limit, offset))
            .await
    }

    pub async fn read_device(
        &self,
        device_id: &Address,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<EventRecord>, RepositoryError> {
        self.access_log_repository
            .query_device_page(device_id, PageRequest::new(limit, offset))
            .await
    }

    pub async fn watermark(&self) -> Result<Option<SyncWatermark>, RepositoryError> {
        self.sync_watermark_repository.get().await
    }

    pub async fn stats(&self) -> Result<CacheStats, RepositoryError> {
        let stats = CacheStats {
            total_events: self.access_log_repository.count().await?,
            distinct_devices: self.access_log_repository.count_devices().await?,
            watermark: self.sync_watermark_repository.get().await?,
        };
        iam_observability::record_cache_snapshot(stats.total_events, stats.distinct_devices);
        Ok(stats)
    }

    /// Drop every cached event and the watermark; the next sync starts from genesis.
    pub async fn clear_cache(&self) -> Result<ClearedCache, RepositoryError> {
        let _guard = self.sync_lock.lock().await;
        let cleared = self.access_log_repository.clear_all().await?;
        tracing::warn!(
            events_removed = cleared.events_removed,
            watermark_removed = cleared.watermark_removed,
            "Access log cache cleared"
        );
        Ok(cleared)
    }

    /// Rewind (or with `None`, remove) the watermark. Cached rows are kept.
    pub async fn reset_watermark(
        &self,
        last_synced_block: Option<u64>,
    ) -> Result<(), RepositoryError> {
        let _guard = self.sync_lock.lock().await;
        self.sync_watermark_repository.reset(last_synced_block).await?;
        tracing::warn!(?last_synced_block, "Sync watermark reset");
        Ok(())
    }
}
