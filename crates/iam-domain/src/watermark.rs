use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest block fully synchronized into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncWatermark {
    pub last_synced_block: u64,
    pub last_sync_time: DateTime<Utc>,
}

impl SyncWatermark {
    /// First block the next sync cycle has to fetch.
    pub fn next_block(&self) -> u64 {
        self.last_synced_block.saturating_add(1)
    }
}
