use std::path::PathBuf;

use iam_blockchain::{EventSourceConfig, EventSourceConfigRaw, FetcherConfig, FetcherConfigRaw};
use iam_repository::{RepositoryManagerConfig, RepositoryManagerConfigRaw};
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    logger::{LoggerConfig, TelemetryConfig},
    periodic_tasks::SyncConfig,
};

/// Configuration as read from the layered sources, before validation.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigRaw {
    pub environment: String,
    pub app_data_path: PathBuf,
    pub repository: RepositoryManagerConfigRaw,
    pub blockchain: EventSourceConfigRaw,
    pub fetcher: FetcherConfigRaw,
    pub sync: SyncConfig,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub environment: String,
    pub repository: RepositoryManagerConfig,
    pub blockchain: EventSourceConfig,
    pub fetcher: FetcherConfig,
    pub sync: SyncConfig,
    pub logger: LoggerConfig,
    pub telemetry: TelemetryConfig,
}

impl ConfigRaw {
    pub(crate) fn resolve(self) -> Result<Config, ConfigError> {
        if self.sync.interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "sync.interval_secs must be greater than 0".to_string(),
            ));
        }

        let repository = self.repository.resolve(&self.app_data_path)?;
        let blockchain = self.blockchain.with_env_overrides().resolve()?;
        let fetcher = self.fetcher.resolve(blockchain.request_timeout)?;

        Ok(Config {
            environment: self.environment,
            repository,
            blockchain,
            fetcher,
            sync: self.sync,
            logger: self.logger,
            telemetry: self.telemetry,
        })
    }
}
