use std::sync::Arc;

use iam_blockchain::{EvmEventSource, RangeFetcher};

use crate::{
    config::{self, CliArgs, Config},
    managers,
    sync::SyncCoordinator,
};

pub(crate) type AccessLogCoordinator = SyncCoordinator<Arc<EvmEventSource>>;

pub(crate) struct CoreBootstrap {
    pub(crate) config: Arc<Config>,
    pub(crate) coordinator: Arc<AccessLogCoordinator>,
}

pub(crate) async fn build_core(args: &CliArgs) -> CoreBootstrap {
    let config = Arc::new(config::initialize_configuration(args));
    crate::logger::initialize(&config.logger, &config.telemetry);

    let managers = managers::initialize(&config.repository, &config.blockchain).await;

    let fetcher = RangeFetcher::new(Arc::clone(&managers.event_source), config.fetcher);
    let coordinator = Arc::new(SyncCoordinator::new(
        fetcher,
        &managers.repository,
        config.sync.genesis_block,
    ));

    CoreBootstrap {
        config,
        coordinator,
    }
}
