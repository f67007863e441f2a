mod provider;

use std::time::Instant;

use alloy::{primitives::Address, providers::Provider, rpc::types::Filter};
use async_trait::async_trait;
use iam_domain::EventRecord;

use crate::{
    config::EventSourceConfig,
    contract_events::{access_logged_signature, decode_access_log},
    error::{EventSourceError, EventSourceInitError},
    rpc_rate_limiter::RpcRateLimiter,
    source::RemoteEventSource,
};
use provider::{EvmProvider, check_connectivity, initialize_provider};

const SOURCE_LABEL: &str = "evm";

/// [`RemoteEventSource`] backed by `eth_blockNumber` / `eth_getLogs`.
pub struct EvmEventSource {
    provider: EvmProvider,
    contract_address: Address,
    confirmations: u64,
    rpc_rate_limiter: RpcRateLimiter,
}

impl EvmEventSource {
    pub async fn connect(config: &EventSourceConfig) -> Result<Self, EventSourceInitError> {
        let provider = initialize_provider(&config.rpc_endpoints)?;
        check_connectivity(&provider, config.rpc_endpoints.len()).await;

        let rpc_rate_limiter = RpcRateLimiter::new(config.max_rpc_requests_per_second);
        if let Some(rps) = config.max_rpc_requests_per_second
            && rpc_rate_limiter.is_limited()
        {
            tracing::info!(rps, "RPC rate limiting enabled");
        }

        tracing::info!(
            contract = %config.contract_address,
            confirmations = config.confirmations,
            "Watching AccessLogged events"
        );

        Ok(Self {
            provider,
            contract_address: config.contract_address,
            confirmations: config.confirmations,
            rpc_rate_limiter,
        })
    }

    fn record_call<T>(
        &self,
        operation: &str,
        started: Instant,
        result: &Result<T, EventSourceError>,
    ) {
        let status = if result.is_ok() { "ok" } else { "error" };
        iam_observability::record_event_source_call(
            SOURCE_LABEL,
            operation,
            status,
            started.elapsed(),
        );
    }
}

#[async_trait]
impl RemoteEventSource for EvmEventSource {
    async fn latest_block_number(&self) -> Result<u64, EventSourceError> {
        self.rpc_rate_limiter.acquire().await;
        let started = Instant::now();
        let result = self
            .provider
            .get_block_number()
            .await
            .map(|head| head.saturating_sub(self.confirmations))
            .map_err(|err| EventSourceError::from_rpc("eth_blockNumber", err));
        self.record_call("latest_block_number", started, &result);
        result
    }

    async fn query_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventRecord>, EventSourceError> {
        let filter = Filter::new()
            .address(self.contract_address)
            .event_signature(access_logged_signature())
            .from_block(from_block)
            .to_block(to_block);

        self.rpc_rate_limiter.acquire().await;
        let started = Instant::now();
        let result = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|err| EventSourceError::from_rpc("eth_getLogs", err))
            .and_then(|logs| {
                logs.iter()
                    .filter(|log| !log.removed)
                    .map(decode_access_log)
                    .collect::<Result<Vec<_>, _>>()
            });
        self.record_call("query_events", started, &result);
        result
    }
}
