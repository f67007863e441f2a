use async_trait::async_trait;
use iam_domain::EventRecord;

use crate::error::EventSourceError;

/// Read access to the on-chain access log.
///
/// Implementations resolve the head they consider final and return the
/// events of an inclusive block range in chain order.
#[async_trait]
pub trait RemoteEventSource: Send + Sync {
    /// Highest block the source is willing to serve.
    async fn latest_block_number(&self) -> Result<u64, EventSourceError>;

    async fn query_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventRecord>, EventSourceError>;
}

#[async_trait]
impl<S: RemoteEventSource + ?Sized> RemoteEventSource for std::sync::Arc<S> {
    async fn latest_block_number(&self) -> Result<u64, EventSourceError> {
        (**self).latest_block_number().await
    }

    async fn query_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<EventRecord>, EventSourceError> {
        (**self).query_events(from_block, to_block).await
    }
}
