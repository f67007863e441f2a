use std::sync::Arc;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub use crate::config::RepositoryManagerConfig;
use crate::{
    error::RepositoryError,
    migrations::Migrator,
    repositories::{
        access_log_repository::AccessLogRepository,
        sync_watermark_repository::SyncWatermarkRepository,
    },
};

pub struct RepositoryManager {
    access_log_repository: AccessLogRepository,
    sync_watermark_repository: SyncWatermarkRepository,
}

impl RepositoryManager {
    /// Opens (creating if needed) the SQLite cache and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if:
    /// - The database directory cannot be created
    /// - Database connection fails (e.g. unwritable file, corrupt database)
    /// - Migrations fail
    pub async fn connect(config: &RepositoryManagerConfig) -> Result<Self, RepositoryError> {
        if let Some(parent) = config.database_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut opt = ConnectOptions::new(config.connection_string());
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .sqlx_logging(true)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        let conn = Database::connect(opt).await?;

        // Readers must see committed rows while a sync batch is being written.
        conn.execute_unprepared("PRAGMA journal_mode=WAL").await?;

        Migrator::up(&conn, None).await?;

        tracing::debug!(
            database = %config.database_path.display(),
            "Access log cache ready"
        );

        Ok(Self::from_connection(Arc::new(conn)))
    }

    pub(crate) fn from_connection(conn: Arc<DatabaseConnection>) -> Self {
        RepositoryManager {
            access_log_repository: AccessLogRepository::new(Arc::clone(&conn)),
            sync_watermark_repository: SyncWatermarkRepository::new(conn),
        }
    }

    pub fn access_log_repository(&self) -> AccessLogRepository {
        self.access_log_repository.clone()
    }

    pub fn sync_watermark_repository(&self) -> SyncWatermarkRepository {
        self.sync_watermark_repository.clone()
    }
}
