use std::{num::NonZeroUsize, sync::Arc};

use alloy::{
    network::Ethereum,
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::client::RpcClient,
    transports::{
        BoxTransport, IntoBoxTransport,
        http::{Http, reqwest::Url},
        layers::FallbackLayer,
    },
};
use tower::ServiceBuilder;

use crate::error::EventSourceInitError;

pub(crate) type EvmProvider = Arc<DynProvider<Ethereum>>;

/// Build a read-only provider over the given HTTP endpoints.
///
/// Endpoints are tried one at a time; the fallback layer ranks them by
/// latency and success rate.
pub(crate) fn initialize_provider(
    rpc_endpoints: &[String],
) -> Result<EvmProvider, EventSourceInitError> {
    let mut transports: Vec<BoxTransport> = Vec::with_capacity(rpc_endpoints.len());

    for endpoint in rpc_endpoints {
        let url = endpoint
            .parse::<Url>()
            .map_err(|e| EventSourceInitError::InvalidRpcUrl {
                url: endpoint.clone(),
                reason: e.to_string(),
            })?;
        transports.push(Http::new(url).into_box_transport());
        tracing::debug!(endpoint = %redact(endpoint), "HTTP RPC endpoint added");
    }

    if transports.is_empty() {
        return Err(EventSourceInitError::RpcConnectionFailed { attempts: 0 });
    }

    let fallback_layer = FallbackLayer::default().with_active_transport_count(NonZeroUsize::MIN);
    let transport = ServiceBuilder::new()
        .layer(fallback_layer)
        .service(transports);
    let client = RpcClient::builder().transport(transport, false);
    let provider = ProviderBuilder::new().connect_client(client);

    Ok(Arc::new(provider.erased()))
}

/// Probe the endpoints once; failure is logged, not fatal, so cached reads keep working.
pub(crate) async fn check_connectivity(provider: &EvmProvider, endpoints: usize) {
    match provider.get_block_number().await {
        Ok(block) => tracing::info!(endpoints, block, "EVM provider initialized"),
        Err(error) => tracing::warn!(
            endpoints,
            error = %error,
            "EVM provider unreachable at startup; sync cycles will retry"
        ),
    }
}

/// Strip the path and query from an endpoint; hosted RPC URLs embed API keys there.
pub(crate) fn redact(endpoint: &str) -> String {
    match endpoint.parse::<Url>() {
        Ok(url) => format!(
            "{}://{}",
            url.scheme(),
            url.host_str().unwrap_or("<unknown-host>")
        ),
        Err(_) => "<invalid-url>".to_string(),
    }
}
