mod block_range;
mod event_record;
mod watermark;

pub use block_range::{BlockRange, BlockTarget};
pub use event_record::{EventRecord, MAX_REASON_BYTES};
pub use watermark::SyncWatermark;

pub use alloy::primitives::{Address, B256};
