use std::time::Duration;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    ConfigError,
    fetcher::FetcherConfig,
    rpc_executor::{RetryPolicy, RetryPolicyRaw},
};

/// Environment variable carrying the RPC endpoint(s), comma separated.
pub const RPC_URL_ENV: &str = "RPC_URL";
/// Environment variable carrying the IAM contract address.
pub const CONTRACT_ADDRESS_ENV: &str = "CONTRACT_ADDRESS";

/// Connection settings for the EVM chain hosting the IAM contract.
///
/// **Secret handling**: the RPC URL usually embeds a provider API key, so
/// both it and the contract address can come from the environment
/// (`RPC_URL`, `CONTRACT_ADDRESS`, typically via `.env`). Environment values
/// take precedence over the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventSourceConfigRaw {
    /// HTTP(S) JSON-RPC endpoints. Extra endpoints are used as fallbacks.
    #[serde(default)]
    pub rpc_endpoints: Vec<String>,

    /// Address of the contract emitting `AccessLogged`.
    pub contract_address: Option<String>,

    /// Blocks subtracted from the chain head before it is considered final.
    pub confirmations: u64,

    /// Maximum RPC requests per second (optional rate limiting).
    pub max_rpc_requests_per_second: Option<u32>,

    /// Timeout for a single RPC call in milliseconds.
    pub request_timeout_ms: u64,
}

impl EventSourceConfigRaw {
    /// Overlay `RPC_URL` / `CONTRACT_ADDRESS` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(urls) = lookup(RPC_URL_ENV) {
            let endpoints: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect();
            if !endpoints.is_empty() {
                self.rpc_endpoints = endpoints;
            }
        }
        if let Some(address) = lookup(CONTRACT_ADDRESS_ENV)
            && !address.trim().is_empty()
        {
            self.contract_address = Some(address.trim().to_string());
        }
        self
    }

    /// Ensures at least one RPC endpoint is configured and every one is HTTP(S).
    pub fn ensure_rpc_endpoints(&self) -> Result<(), ConfigError> {
        if self.rpc_endpoints.is_empty() {
            return Err(ConfigError::MissingSecret(format!(
                "{RPC_URL_ENV} env var or blockchain.rpc_endpoints config required"
            )));
        }
        if let Some(endpoint) = self
            .rpc_endpoints
            .iter()
            .find(|endpoint| !(endpoint.starts_with("http://") || endpoint.starts_with("https://")))
        {
            return Err(ConfigError::InvalidConfig(format!(
                "rpc endpoint '{endpoint}' must use http:// or https://"
            )));
        }
        Ok(())
    }

    /// Ensures the RPC rate limit, if configured, is greater than zero.
    pub fn ensure_max_rpc_requests_per_second(&self) -> Result<(), ConfigError> {
        if self.max_rpc_requests_per_second == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "max_rpc_requests_per_second must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn resolve(self) -> Result<EventSourceConfig, ConfigError> {
        self.ensure_rpc_endpoints()?;
        self.ensure_max_rpc_requests_per_second()?;

        let contract_address = self.contract_address.as_deref().ok_or_else(|| {
            ConfigError::MissingSecret(format!(
                "{CONTRACT_ADDRESS_ENV} env var or blockchain.contract_address config required"
            ))
        })?;
        let contract_address = parse_evm_address(contract_address)?;

        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(EventSourceConfig {
            rpc_endpoints: self.rpc_endpoints,
            contract_address,
            confirmations: self.confirmations,
            max_rpc_requests_per_second: self.max_rpc_requests_per_second,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        })
    }
}

#[derive(Debug, Clone)]
pub struct EventSourceConfig {
    pub rpc_endpoints: Vec<String>,
    pub contract_address: Address,
    pub confirmations: u64,
    pub max_rpc_requests_per_second: Option<u32>,
    pub request_timeout: Duration,
}

/// How the range fetcher splits and retries its requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetcherConfigRaw {
    /// Widest block range sent in a single `eth_getLogs` call.
    pub max_block_span: u64,
    pub retry: RetryPolicyRaw,
}

impl FetcherConfigRaw {
    /// `request_timeout` comes from the event source settings.
    pub fn resolve(self, request_timeout: Duration) -> Result<FetcherConfig, ConfigError> {
        if self.max_block_span == 0 {
            return Err(ConfigError::InvalidConfig(
                "fetcher.max_block_span must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "fetcher.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::InvalidConfig(format!(
                "fetcher.retry.base_delay_ms ({}) exceeds max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }

        Ok(FetcherConfig {
            max_block_span: self.max_block_span,
            retry_policy: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                base_delay: Duration::from_millis(self.retry.base_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
            },
            request_timeout,
        })
    }
}

fn parse_evm_address(value: &str) -> Result<Address, ConfigError> {
    value
        .parse::<Address>()
        .map_err(|e| ConfigError::InvalidConfig(format!("invalid EVM address '{}': {}", value, e)))
}
