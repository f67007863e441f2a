/// Offset pagination over cached events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u64,
    pub offset: u64,
}

impl PageRequest {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }
}

/// Rows removed by a cache clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearedCache {
    pub events_removed: u64,
    pub watermark_removed: bool,
}
