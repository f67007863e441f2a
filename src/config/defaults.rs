//! Typed default configurations for each environment.
//!
//! Every environment gets a fully constructed [`ConfigRaw`] via
//! [`config_for`]; config files only need to list what differs.

use std::path::PathBuf;

use iam_blockchain::{EventSourceConfigRaw, FetcherConfigRaw, RetryPolicy};
use iam_repository::RepositoryManagerConfigRaw;

use super::{ConfigError, ConfigRaw};
use crate::{
    logger::{LogFormat, LoggerConfig, TelemetryConfig, TelemetryMetricsConfig},
    periodic_tasks::SyncConfig,
};

/// Returns the default [`ConfigRaw`] for the given environment name.
pub(crate) fn config_for(environment: &str) -> Result<ConfigRaw, ConfigError> {
    match environment {
        "development" => Ok(development()),
        "testnet" => Ok(testnet()),
        "mainnet" => Ok(mainnet()),
        _ => Err(ConfigError::UnknownEnvironment(environment.to_string())),
    }
}

// ── Shared defaults ─────────────────────────────────────────────

fn repository() -> RepositoryManagerConfigRaw {
    RepositoryManagerConfigRaw {
        database_file: "access_log.sqlite".to_string(),
        max_connections: 4,
        min_connections: 1,
    }
}

fn fetcher() -> FetcherConfigRaw {
    FetcherConfigRaw {
        max_block_span: 1000,
        retry: RetryPolicy::rpc_default().into(),
    }
}

fn telemetry(metrics_enabled: bool) -> TelemetryConfig {
    TelemetryConfig {
        metrics: TelemetryMetricsConfig {
            enabled: metrics_enabled,
            bind_address: "127.0.0.1:9464".to_string(),
        },
    }
}

// ── Parameterized helpers ───────────────────────────────────────

/// Public networks get their endpoint and contract from `RPC_URL` /
/// `CONTRACT_ADDRESS` or the config file.
fn blockchain(
    rpc_endpoints: Vec<String>,
    contract_address: Option<&str>,
    confirmations: u64,
) -> EventSourceConfigRaw {
    EventSourceConfigRaw {
        rpc_endpoints,
        contract_address: contract_address.map(str::to_string),
        confirmations,
        max_rpc_requests_per_second: None,
        request_timeout_ms: 30_000,
    }
}

fn sync(interval_secs: u64) -> SyncConfig {
    SyncConfig {
        enabled: true,
        interval_secs,
        genesis_block: 0,
    }
}

fn logger(level: &str, format: LogFormat) -> LoggerConfig {
    LoggerConfig {
        level: level.to_string(),
        format,
    }
}

// ── Per-environment constructors ────────────────────────────────

fn development() -> ConfigRaw {
    ConfigRaw {
        environment: "development".to_string(),
        app_data_path: PathBuf::from("data"),
        repository: repository(),
        blockchain: blockchain(
            vec!["http://localhost:8545".to_string()],
            // First contract deployed by the default hardhat account.
            Some("0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            0,
        ),
        fetcher: fetcher(),
        sync: sync(5),
        logger: logger(
            "info,iot_iam_sync=debug,iam_blockchain=debug,iam_repository=debug",
            LogFormat::Pretty,
        ),
        telemetry: telemetry(false),
    }
}

fn testnet() -> ConfigRaw {
    ConfigRaw {
        environment: "testnet".to_string(),
        app_data_path: PathBuf::from("data"),
        repository: repository(),
        blockchain: blockchain(Vec::new(), None, 2),
        fetcher: fetcher(),
        sync: sync(15),
        logger: logger("info", LogFormat::Pretty),
        telemetry: telemetry(true),
    }
}

fn mainnet() -> ConfigRaw {
    ConfigRaw {
        environment: "mainnet".to_string(),
        app_data_path: PathBuf::from("data"),
        repository: repository(),
        blockchain: blockchain(Vec::new(), None, 2),
        fetcher: fetcher(),
        sync: sync(15),
        logger: logger("info", LogFormat::Json),
        telemetry: telemetry(true),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn unknown_environment_is_rejected() {
        assert!(matches!(
            config_for("staging"),
            Err(ConfigError::UnknownEnvironment(_))
        ));
    }

    #[test]
    fn public_networks_wait_for_confirmations() {
        for environment in ["testnet", "mainnet"] {
            let config = config_for(environment).unwrap();
            assert_eq!(config.environment, environment);
            assert_eq!(config.blockchain.confirmations, 2);
            assert!(config.blockchain.rpc_endpoints.is_empty());
            assert!(config.blockchain.contract_address.is_none());
        }
    }

    #[test]
    fn development_defaults_point_at_local_node() {
        let config = config_for("development").unwrap();
        assert_eq!(config.blockchain.rpc_endpoints, vec!["http://localhost:8545"]);
        assert_eq!(config.blockchain.confirmations, 0);
        assert_eq!(config.fetcher.max_block_span, 1000);
        assert_eq!(config.sync.interval_secs, 5);
    }
}
