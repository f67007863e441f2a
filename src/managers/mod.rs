use std::sync::Arc;

use iam_blockchain::{EventSourceConfig, EvmEventSource};
use iam_repository::{RepositoryManager, RepositoryManagerConfig};

pub(crate) struct Managers {
    pub repository: Arc<RepositoryManager>,
    pub event_source: Arc<EvmEventSource>,
}

/// Open the cache database and build the chain client.
///
/// The chain is not required to be reachable here; the cache stays readable
/// while the RPC endpoints are down.
pub(crate) async fn initialize(
    repository_config: &RepositoryManagerConfig,
    event_source_config: &EventSourceConfig,
) -> Managers {
    let repository = Arc::new(
        RepositoryManager::connect(repository_config)
            .await
            .expect("Failed to initialize repository manager"),
    );

    let event_source = Arc::new(
        EvmEventSource::connect(event_source_config)
            .await
            .expect("Failed to initialize EVM event source"),
    );

    Managers {
        repository,
        event_source,
    }
}
