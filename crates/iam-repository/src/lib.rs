mod config;
mod config_error;
pub mod error;
mod manager;
mod migrations;
mod models;
mod observability;
mod repositories;
mod types;

pub use config::{RepositoryManagerConfig, RepositoryManagerConfigRaw};
pub use config_error::ConfigError;
pub use error::RepositoryError;
pub use manager::RepositoryManager;
pub use repositories::{
    access_log_repository::AccessLogRepository,
    sync_watermark_repository::SyncWatermarkRepository,
};
pub use types::{ClearedCache, PageRequest};

#[cfg(test)]
mod test_support;
