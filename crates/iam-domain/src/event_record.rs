use std::cmp::Ordering;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Upper bound on the reason payload the access-control contract accepts.
pub const MAX_REASON_BYTES: usize = 256;

/// One `AccessLogged` occurrence observed on chain.
///
/// Identity is `(tx_hash, log_index)`; `block_number` only orders records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub device_id: Address,
    pub reason: String,
    pub success: bool,
    /// Unix seconds, taken from block time at emission.
    pub timestamp: u64,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: B256,
}

impl EventRecord {
    /// Chain order: block, then position inside the block.
    ///
    /// `tx_hash` only breaks ties between records that disagree on everything
    /// else, which keeps the order total.
    pub fn chain_order(&self, other: &Self) -> Ordering {
        self.block_number
            .cmp(&other.block_number)
            .then(self.log_index.cmp(&other.log_index))
            .then(self.tx_hash.cmp(&other.tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(block_number: u64, log_index: u64, tx_byte: u8) -> EventRecord {
        EventRecord {
            device_id: Address::repeat_byte(0x11),
            reason: "door".to_string(),
            success: true,
            timestamp: 1_700_000_000,
            block_number,
            log_index,
            tx_hash: B256::repeat_byte(tx_byte),
        }
    }

    #[test]
    fn test_chain_order_sorts_by_block_then_log_index() {
        let mut records = vec![record(7, 0, 1), record(5, 1, 2), record(5, 0, 3)];
        records.sort_by(EventRecord::chain_order);

        let order: Vec<(u64, u64)> = records
            .iter()
            .map(|r| (r.block_number, r.log_index))
            .collect();
        assert_eq!(order, vec![(5, 0), (5, 1), (7, 0)]);
    }
}
