#![allow(clippy::unwrap_used)]

use tempfile::TempDir;

use crate::{RepositoryManager, RepositoryManagerConfig};

pub(crate) fn temp_config(dir: &TempDir) -> RepositoryManagerConfig {
    RepositoryManagerConfig {
        database_path: dir.path().join("cache/access_log.sqlite"),
        max_connections: 4,
        min_connections: 1,
    }
}

/// Fresh migrated cache in a temporary directory. Keep the `TempDir` alive for the test.
pub(crate) async fn connect_temp() -> (TempDir, RepositoryManager) {
    let dir = TempDir::new().unwrap();
    let manager = RepositoryManager::connect(&temp_config(&dir)).await.unwrap();
    (dir, manager)
}
