use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use iam_domain::SyncWatermark;
use sea_orm::{ActiveValue, ConnectionTrait, DatabaseConnection, EntityTrait, sea_query::OnConflict};

use crate::{
    error::{RepositoryError, Result, from_db_int, to_db_int},
    models::sync_watermark::{ActiveModel, Column, Entity, Model, WATERMARK_ROW_ID},
    observability::record_outcome,
};

const TABLE: &str = "sync_watermark";

#[derive(Clone)]
pub struct SyncWatermarkRepository {
    conn: Arc<DatabaseConnection>,
}

impl SyncWatermarkRepository {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    pub async fn get(&self) -> Result<Option<SyncWatermark>> {
        let started = Instant::now();
        let result = load_watermark(self.conn.as_ref()).await;
        record_outcome(TABLE, "get", started, &result, |w| usize::from(w.is_some()));
        result
    }

    /// Advance the watermark on its own.
    ///
    /// Sync cycles go through `AccessLogRepository::commit_sync_batch`, which
    /// writes the watermark in the same transaction as the rows it covers.
    pub async fn set(&self, last_synced_block: u64, last_sync_time: DateTime<Utc>) -> Result<()> {
        let started = Instant::now();
        let result = advance_watermark(self.conn.as_ref(), last_synced_block, last_sync_time).await;
        record_outcome(TABLE, "set", started, &result, |_| 1);
        result
    }

    /// Explicit maintenance rewind.
    ///
    /// `None` removes the watermark so the next sync starts from genesis.
    pub async fn reset(&self, last_synced_block: Option<u64>) -> Result<()> {
        let started = Instant::now();
        let result = match last_synced_block {
            Some(block) => write_watermark(self.conn.as_ref(), block, Utc::now()).await,
            None => delete_watermark(self.conn.as_ref()).await.map(|_| ()),
        };
        record_outcome(TABLE, "reset", started, &result, |_| 1);
        result
    }
}

pub(crate) async fn load_watermark<C: ConnectionTrait>(conn: &C) -> Result<Option<SyncWatermark>> {
    Entity::find_by_id(WATERMARK_ROW_ID)
        .one(conn)
        .await?
        .map(into_watermark)
        .transpose()
}

/// Monotonic write used by sync cycles; a lower block than the stored one is rejected.
pub(crate) async fn advance_watermark<C: ConnectionTrait>(
    conn: &C,
    last_synced_block: u64,
    last_sync_time: DateTime<Utc>,
) -> Result<()> {
    let stored = load_watermark(conn).await?;
    if let Some(stored) = stored
        && stored.last_synced_block > last_synced_block
    {
        return Err(RepositoryError::WatermarkRegression {
            stored: stored.last_synced_block,
            requested: last_synced_block,
        });
    }

    write_watermark(conn, last_synced_block, last_sync_time).await
}

pub(crate) async fn delete_watermark<C: ConnectionTrait>(conn: &C) -> Result<bool> {
    let result = Entity::delete_by_id(WATERMARK_ROW_ID).exec(conn).await?;
    Ok(result.rows_affected > 0)
}

async fn write_watermark<C: ConnectionTrait>(
    conn: &C,
    last_synced_block: u64,
    last_sync_time: DateTime<Utc>,
) -> Result<()> {
    let model = ActiveModel {
        id: ActiveValue::Set(WATERMARK_ROW_ID),
        last_synced_block: ActiveValue::Set(to_db_int("last_synced_block", last_synced_block)?),
        last_sync_time: ActiveValue::Set(last_sync_time.timestamp()),
    };

    Entity::insert(model)
        .on_conflict(
            OnConflict::column(Column::Id)
                .update_columns([Column::LastSyncedBlock, Column::LastSyncTime])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

fn into_watermark(model: Model) -> Result<SyncWatermark> {
    let last_synced_block = from_db_int(TABLE, "last_synced_block", model.last_synced_block)?;
    let last_sync_time = DateTime::<Utc>::from_timestamp(model.last_sync_time, 0).ok_or_else(|| {
        RepositoryError::CorruptRow {
            table: TABLE,
            reason: format!("invalid last_sync_time: {}", model.last_sync_time),
        }
    })?;

    Ok(SyncWatermark {
        last_synced_block,
        last_sync_time,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use crate::test_support::connect_temp;

    use super::*;

    #[tokio::test]
    async fn test_watermark_absent_until_first_set() {
        let (_dir, manager) = connect_temp().await;
        let repository = manager.sync_watermark_repository();

        assert_eq!(repository.get().await.unwrap(), None);

        let time = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        repository.set(120, time).await.unwrap();

        let watermark = repository.get().await.unwrap().unwrap();
        assert_eq!(watermark.last_synced_block, 120);
        assert_eq!(watermark.last_sync_time, time);
        assert_eq!(watermark.next_block(), 121);
    }

    #[tokio::test]
    async fn test_set_rejects_regression() {
        let (_dir, manager) = connect_temp().await;
        let repository = manager.sync_watermark_repository();

        repository.set(500, Utc::now()).await.unwrap();
        let error = repository.set(499, Utc::now()).await.unwrap_err();

        assert!(matches!(
            error,
            RepositoryError::WatermarkRegression {
                stored: 500,
                requested: 499
            }
        ));
        assert_eq!(
            repository.get().await.unwrap().unwrap().last_synced_block,
            500
        );
    }

    #[tokio::test]
    async fn test_reset_rewinds_or_removes() {
        let (_dir, manager) = connect_temp().await;
        let repository = manager.sync_watermark_repository();

        repository.set(900, Utc::now()).await.unwrap();
        repository.reset(Some(10)).await.unwrap();
        assert_eq!(
            repository.get().await.unwrap().unwrap().last_synced_block,
            10
        );

        repository.reset(None).await.unwrap();
        assert_eq!(repository.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_watermark_survives_reconnect() {
        let dir = TempDir::new().unwrap();
        let config = crate::test_support::temp_config(&dir);

        {
            let manager = crate::RepositoryManager::connect(&config).await.unwrap();
            manager
                .sync_watermark_repository()
                .set(77, Utc::now())
                .await
                .unwrap();
        }

        let manager = crate::RepositoryManager::connect(&config).await.unwrap();
        let watermark = manager.sync_watermark_repository().get().await.unwrap();
        assert_eq!(watermark.map(|w| w.last_synced_block), Some(77));
    }
}
