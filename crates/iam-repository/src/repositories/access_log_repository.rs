use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use iam_domain::{Address, B256, EventRecord};
use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait, sea_query::OnConflict,
};

use crate::{
    error::{RepositoryError, Result, from_db_int, to_db_int},
    models::access_log::{ActiveModel, Column, Entity, Model},
    observability::record_outcome,
    repositories::sync_watermark_repository::{advance_watermark, delete_watermark},
    types::{ClearedCache, PageRequest},
};

const TABLE: &str = "access_log";

/// Rows per INSERT statement; keeps bound parameters well under SQLite's limit.
const INSERT_CHUNK_SIZE: usize = 100;

#[derive(Clone)]
pub struct AccessLogRepository {
    conn: Arc<DatabaseConnection>,
}

impl AccessLogRepository {
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Insert a record unless `(tx_hash, log_index)` is already cached.
    ///
    /// Returns `false` for a duplicate; duplicates are not an error.
    pub async fn insert_if_absent(&self, record: &EventRecord) -> Result<bool> {
        let started = Instant::now();
        let result = insert_records(self.conn.as_ref(), std::slice::from_ref(record))
            .await
            .map(|inserted| inserted == 1);
        record_outcome(TABLE, "insert_if_absent", started, &result, |inserted| {
            usize::from(*inserted)
        });
        result
    }

    /// Insert every record not yet cached, all-or-nothing.
    pub async fn bulk_insert_if_absent(&self, records: &[EventRecord]) -> Result<u64> {
        let started = Instant::now();
        let result = async {
            let txn = self.conn.begin().await?;
            let inserted = insert_records(&txn, records).await?;
            txn.commit().await?;
            Ok(inserted)
        }
        .await;
        record_outcome(TABLE, "bulk_insert_if_absent", started, &result, |n| {
            *n as usize
        });
        result
    }

    /// Persist a fetched batch and advance the sync watermark in one transaction.
    ///
    /// Either the rows and the new watermark are both visible afterwards, or
    /// neither is.
    pub async fn commit_sync_batch(
        &self,
        records: &[EventRecord],
        last_synced_block: u64,
        last_sync_time: DateTime<Utc>,
    ) -> Result<u64> {
        let started = Instant::now();
        let result = async {
            let txn = self.conn.begin().await?;
            let inserted = insert_records(&txn, records).await?;
            advance_watermark(&txn, last_synced_block, last_sync_time).await?;
            txn.commit().await?;
            Ok(inserted)
        }
        .await;
        record_outcome(TABLE, "commit_sync_batch", started, &result, |n| *n as usize);
        result
    }

    /// Page through cached events, newest first.
    ///
    /// Ordered by `block_number desc, log_index desc`, with `tx_hash` as the
    /// final tie-breaker so repeated calls return identical pages.
    pub async fn query_page(&self, page: PageRequest) -> Result<Vec<EventRecord>> {
        let started = Instant::now();
        let result = fetch_page(self.conn.as_ref(), Entity::find(), page).await;
        record_outcome(TABLE, "query_page", started, &result, Vec::len);
        result
    }

    /// Same ordering as [`Self::query_page`], restricted to one device.
    pub async fn query_device_page(
        &self,
        device_id: &Address,
        page: PageRequest,
    ) -> Result<Vec<EventRecord>> {
        let started = Instant::now();
        let query = Entity::find().filter(Column::DeviceId.eq(device_key(device_id)));
        let result = fetch_page(self.conn.as_ref(), query, page).await;
        record_outcome(TABLE, "query_device_page", started, &result, Vec::len);
        result
    }

    pub async fn count(&self) -> Result<u64> {
        let started = Instant::now();
        let result = Entity::find()
            .count(self.conn.as_ref())
            .await
            .map_err(Into::into);
        record_outcome(TABLE, "count", started, &result, |n| *n as usize);
        result
    }

    pub async fn count_devices(&self) -> Result<u64> {
        let started = Instant::now();
        let result = Entity::find()
            .select_only()
            .column(Column::DeviceId)
            .distinct()
            .count(self.conn.as_ref())
            .await
            .map_err(Into::into);
        record_outcome(TABLE, "count_devices", started, &result, |n| *n as usize);
        result
    }

    /// Maintenance: drop every cached event and the watermark together.
    pub async fn clear_all(&self) -> Result<ClearedCache> {
        let started = Instant::now();
        let result = async {
            let txn = self.conn.begin().await?;
            let events_removed = Entity::delete_many().exec(&txn).await?.rows_affected;
            let watermark_removed = delete_watermark(&txn).await?;
            txn.commit().await?;
            Ok(ClearedCache {
                events_removed,
                watermark_removed,
            })
        }
        .await;
        record_outcome(TABLE, "clear_all", started, &result, |cleared| {
            cleared.events_removed as usize
        });
        result
    }
}

/// Insert records chunk by chunk on `conn`, skipping keys that already exist.
///
/// Conversion happens per chunk, so a bad record can fail the call after
/// earlier chunks were written; callers wrap this in a transaction.
pub(crate) async fn insert_records<C: ConnectionTrait>(
    conn: &C,
    records: &[EventRecord],
) -> Result<u64> {
    let created_at = Utc::now().timestamp();
    let mut inserted = 0;

    for chunk in records.chunks(INSERT_CHUNK_SIZE) {
        let models = chunk
            .iter()
            .map(|record| to_active_model(record, created_at))
            .collect::<Result<Vec<_>>>()?;

        inserted += Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([Column::TxHash, Column::LogIndex])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;
    }

    Ok(inserted)
}

async fn fetch_page<C: ConnectionTrait>(
    conn: &C,
    query: Select<Entity>,
    page: PageRequest,
) -> Result<Vec<EventRecord>> {
    // SQLite binds LIMIT/OFFSET as i64; no table can hold more rows than that.
    let max = i64::MAX as u64;
    if page.limit == 0 || page.offset > max {
        return Ok(Vec::new());
    }

    query
        .order_by_desc(Column::BlockNumber)
        .order_by_desc(Column::LogIndex)
        .order_by_desc(Column::TxHash)
        .limit(page.limit.min(max))
        .offset(page.offset)
        .all(conn)
        .await?
        .into_iter()
        .map(into_record)
        .collect()
}

fn device_key(device_id: &Address) -> String {
    device_id.to_checksum(None)
}

fn to_active_model(record: &EventRecord, created_at: i64) -> Result<ActiveModel> {
    Ok(ActiveModel {
        tx_hash: ActiveValue::Set(format!("{:#x}", record.tx_hash)),
        log_index: ActiveValue::Set(to_db_int("log_index", record.log_index)?),
        device_id: ActiveValue::Set(device_key(&record.device_id)),
        reason: ActiveValue::Set(record.reason.clone()),
        success: ActiveValue::Set(record.success),
        timestamp: ActiveValue::Set(to_db_int("timestamp", record.timestamp)?),
        block_number: ActiveValue::Set(to_db_int("block_number", record.block_number)?),
        created_at: ActiveValue::Set(created_at),
    })
}

fn into_record(model: Model) -> Result<EventRecord> {
    let tx_hash = model
        .tx_hash
        .parse::<B256>()
        .map_err(|error| RepositoryError::CorruptRow {
            table: TABLE,
            reason: format!("tx_hash '{}': {}", model.tx_hash, error),
        })?;
    let device_id = model
        .device_id
        .parse::<Address>()
        .map_err(|error| RepositoryError::CorruptRow {
            table: TABLE,
            reason: format!("device_id '{}': {}", model.device_id, error),
        })?;

    Ok(EventRecord {
        device_id,
        reason: model.reason,
        success: model.success,
        timestamp: from_db_int(TABLE, "timestamp", model.timestamp)?,
        block_number: from_db_int(TABLE, "block_number", model.block_number)?,
        log_index: from_db_int(TABLE, "log_index", model.log_index)?,
        tx_hash,
    })
}
