mod coordinator;

pub use coordinator::{CacheStats, SyncCoordinator, SyncSummary};
