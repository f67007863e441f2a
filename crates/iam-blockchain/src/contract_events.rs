use alloy::{
    primitives::B256,
    rpc::types::Log,
    sol,
    sol_types::SolEvent,
};
use iam_domain::{EventRecord, MAX_REASON_BYTES};

use crate::error::EventSourceError;

sol! {
    /// Emitted by the IAM contract for every device access attempt.
    #[derive(Debug, PartialEq, Eq)]
    event AccessLogged(address indexed device, bool success, string reason, uint256 timestamp);
}

/// Topic0 filter for the monitored event.
pub fn access_logged_signature() -> B256 {
    AccessLogged::SIGNATURE_HASH
}

/// Turn a raw `AccessLogged` log into an [`EventRecord`].
///
/// Pending logs (no block, transaction or index) and payloads that do not fit
/// the record are rejected as structural failures.
pub fn decode_access_log(log: &Log) -> Result<EventRecord, EventSourceError> {
    match log.topic0() {
        Some(topic) if *topic == AccessLogged::SIGNATURE_HASH => {}
        Some(topic) => {
            return Err(EventSourceError::structural(format!(
                "unexpected event topic {topic}"
            )));
        }
        None => return Err(EventSourceError::structural("log without topics")),
    }

    let block_number = log
        .block_number
        .ok_or_else(|| EventSourceError::structural("log is missing its block number"))?;
    let log_index = log
        .log_index
        .ok_or_else(|| EventSourceError::structural("log is missing its log index"))?;
    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| EventSourceError::structural("log is missing its transaction hash"))?;

    let event = AccessLogged::decode_log(&log.inner)
        .map_err(|e| {
            EventSourceError::structural(format!(
                "undecodable AccessLogged at block {block_number}, index {log_index}: {e}"
            ))
        })?
        .data;

    let timestamp = u64::try_from(event.timestamp).map_err(|_| {
        EventSourceError::structural(format!(
            "timestamp {} at block {block_number} does not fit in u64",
            event.timestamp
        ))
    })?;

    if event.reason.len() > MAX_REASON_BYTES {
        return Err(EventSourceError::structural(format!(
            "reason at block {block_number}, index {log_index} is {} bytes (max {MAX_REASON_BYTES})",
            event.reason.len()
        )));
    }

    Ok(EventRecord {
        device_id: event.device,
        reason: event.reason,
        success: event.success,
        timestamp,
        block_number,
        log_index,
        tx_hash,
    })
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, LogData, U256};

    use super::*;

    fn access_log(event: &AccessLogged) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0xaa),
                data: event.encode_log_data(),
            },
            block_number: Some(42),
            transaction_hash: Some(B256::repeat_byte(0x11)),
            log_index: Some(3),
            ..Default::default()
        }
    }

    fn event(reason: &str) -> AccessLogged {
        AccessLogged {
            device: Address::repeat_byte(0x42),
            success: true,
            reason: reason.to_string(),
            timestamp: U256::from(1_700_000_000u64),
        }
    }

    #[test]
    fn decodes_access_logged() {
        let record = decode_access_log(&access_log(&event("badge accepted"))).unwrap();

        assert_eq!(
            record,
            EventRecord {
                device_id: Address::repeat_byte(0x42),
                reason: "badge accepted".to_string(),
                success: true,
                timestamp: 1_700_000_000,
                block_number: 42,
                log_index: 3,
                tx_hash: B256::repeat_byte(0x11),
            }
        );
    }

    #[test]
    fn reason_at_limit_is_accepted_and_above_is_structural() {
        let at_limit = "a".repeat(MAX_REASON_BYTES);
        assert!(decode_access_log(&access_log(&event(&at_limit))).is_ok());

        let too_long = "a".repeat(MAX_REASON_BYTES + 1);
        let err = decode_access_log(&access_log(&event(&too_long))).unwrap_err();
        assert!(!err.is_transient());
    }

    #[test]
    fn pending_log_is_structural() {
        let mut log = access_log(&event("ok"));
        log.block_number = None;

        assert!(matches!(
            decode_access_log(&log),
            Err(EventSourceError::Structural { .. })
        ));
    }

    #[test]
    fn oversized_timestamp_is_structural() {
        let mut oversized = event("ok");
        oversized.timestamp = U256::from(u64::MAX) + U256::from(1u8);

        assert!(matches!(
            decode_access_log(&access_log(&oversized)),
            Err(EventSourceError::Structural { .. })
        ));
    }

    #[test]
    fn foreign_topic_is_structural() {
        let mut log = access_log(&event("ok"));
        log.inner.data = LogData::new_unchecked(vec![B256::repeat_byte(0xee)], Default::default());

        let err = decode_access_log(&log).unwrap_err();
        assert!(err.to_string().contains("unexpected event topic"));
    }
}
