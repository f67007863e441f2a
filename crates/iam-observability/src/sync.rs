use std::time::Duration;

use metrics::{counter, gauge, histogram};

pub fn record_sync_cycle(
    status: &str,
    duration: Duration,
    block_span: u64,
    fetched_events: usize,
    inserted_events: u64,
) {
    counter!(
        "iam_sync_cycle_total",
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "iam_sync_cycle_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
    histogram!(
        "iam_sync_cycle_blocks",
        "status" => status.to_string()
    )
    .record(block_span as f64);
    histogram!(
        "iam_sync_cycle_fetched_events",
        "status" => status.to_string()
    )
    .record(fetched_events as f64);
    histogram!(
        "iam_sync_cycle_inserted_events",
        "status" => status.to_string()
    )
    .record(inserted_events as f64);
}

pub fn record_sync_watermark(last_synced_block: u64) {
    gauge!("iam_sync_watermark_block").set(last_synced_block as f64);
}

pub fn record_cache_snapshot(total_events: u64, distinct_devices: u64) {
    gauge!("iam_cache_events_total").set(total_events as f64);
    gauge!("iam_cache_devices_total").set(distinct_devices as f64);
}
