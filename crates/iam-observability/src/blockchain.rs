use std::time::Duration;

use metrics::{counter, histogram};

pub fn record_event_source_call(source: &str, operation: &str, status: &str, duration: Duration) {
    counter!(
        "iam_event_source_calls_total",
        "source" => source.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "iam_event_source_call_duration_seconds",
        "source" => source.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_event_source_retry(source: &str, operation: &str) {
    counter!(
        "iam_event_source_retries_total",
        "source" => source.to_string(),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// One sub-range query issued by the range fetcher, including its retries.
pub fn record_fetch_sub_range(
    status: &str,
    duration: Duration,
    attempts: usize,
    block_span: u64,
    events: usize,
) {
    counter!(
        "iam_fetch_sub_range_total",
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "iam_fetch_sub_range_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());
    histogram!(
        "iam_fetch_sub_range_attempts",
        "status" => status.to_string()
    )
    .record(attempts as f64);
    histogram!(
        "iam_fetch_sub_range_blocks",
        "status" => status.to_string()
    )
    .record(block_span as f64);
    histogram!(
        "iam_fetch_sub_range_events",
        "status" => status.to_string()
    )
    .record(events as f64);
}
