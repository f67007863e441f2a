use std::time::{Duration, Instant};

use iam_domain::{BlockRange, BlockTarget, EventRecord};
use tokio_util::sync::CancellationToken;

use crate::{
    error::EventSourceError,
    rpc_executor::{RetryPolicy, RetryableError, backoff_delay, with_jitter},
    source::RemoteEventSource,
};

/// Resolved fetcher settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Widest inclusive sub-range sent to the source in one request.
    pub max_block_span: u64,
    pub retry_policy: RetryPolicy,
    /// Upper bound for a single remote call.
    pub request_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_block_span: 1000,
            retry_policy: RetryPolicy::rpc_default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Events of a fully fetched range, in chain order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// The requested range with `Latest` resolved; empty when nothing was new.
    pub range: BlockRange,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to resolve latest block after {attempts} attempt(s): {source}")]
    HeadResolution {
        attempts: usize,
        #[source]
        source: EventSourceError,
    },

    #[error("Sub-range {range} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        range: BlockRange,
        attempts: usize,
        last_completed_block: Option<u64>,
        #[source]
        source: EventSourceError,
    },

    #[error("Sub-range {range} failed permanently: {source}")]
    Structural {
        range: BlockRange,
        last_completed_block: Option<u64>,
        #[source]
        source: EventSourceError,
    },

    #[error("Fetch cancelled")]
    Cancelled { last_completed_block: Option<u64> },
}

impl FetchError {
    /// Upper bound of the last sub-range fully fetched before the failure.
    pub fn last_completed_block(&self) -> Option<u64> {
        match self {
            Self::HeadResolution { .. } => None,
            Self::RetriesExhausted {
                last_completed_block,
                ..
            }
            | Self::Structural {
                last_completed_block,
                ..
            }
            | Self::Cancelled {
                last_completed_block,
            } => *last_completed_block,
        }
    }
}

enum CallFailure {
    Failed {
        attempts: usize,
        error: EventSourceError,
    },
    Cancelled,
}

/// Fetches event ranges from a [`RemoteEventSource`] in bounded sub-ranges.
///
/// Holds no state between calls beyond its configuration.
pub struct RangeFetcher<S> {
    source: S,
    config: FetcherConfig,
}

impl<S: RemoteEventSource> RangeFetcher<S> {
    pub fn new(source: S, config: FetcherConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch every event in `[from_block, to]`.
    ///
    /// `Latest` is resolved once, up front. Sub-ranges are queried in
    /// increasing order and `cancel` is observed between them.
    pub async fn fetch(
        &self,
        from_block: u64,
        to: BlockTarget,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        let to_block = match to {
            BlockTarget::Number(block) => block,
            BlockTarget::Latest => self
                .call_with_retry("latest_block_number", cancel, || {
                    self.source.latest_block_number()
                })
                .await
                .map_err(|failure| match failure {
                    CallFailure::Failed { attempts, error } => FetchError::HeadResolution {
                        attempts,
                        source: error,
                    },
                    CallFailure::Cancelled => FetchError::Cancelled {
                        last_completed_block: None,
                    },
                })?
                .0,
        };

        let range = BlockRange::new(from_block, to_block);
        let mut events = Vec::new();
        if range.is_empty() {
            return Ok(FetchOutcome { range, events });
        }

        let mut last_completed_block = None;
        for sub_range in range.chunks(self.config.max_block_span) {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled {
                    last_completed_block,
                });
            }

            let started = Instant::now();
            let result = self
                .call_with_retry("query_events", cancel, || {
                    self.source.query_events(sub_range.from, sub_range.to)
                })
                .await
                .and_then(|(batch, attempts)| {
                    validate_batch(sub_range, batch)
                        .map(|batch| (batch, attempts))
                        .map_err(|error| CallFailure::Failed { attempts, error })
                });

            match result {
                Ok((mut batch, attempts)) => {
                    iam_observability::record_fetch_sub_range(
                        "ok",
                        started.elapsed(),
                        attempts,
                        sub_range.span(),
                        batch.len(),
                    );
                    tracing::debug!(
                        range = %sub_range,
                        events = batch.len(),
                        attempts,
                        "Fetched sub-range"
                    );
                    batch.sort_by(EventRecord::chain_order);
                    events.append(&mut batch);
                    last_completed_block = Some(sub_range.to);
                }
                Err(CallFailure::Cancelled) => {
                    return Err(FetchError::Cancelled {
                        last_completed_block,
                    });
                }
                Err(CallFailure::Failed { attempts, error }) => {
                    iam_observability::record_fetch_sub_range(
                        "error",
                        started.elapsed(),
                        attempts,
                        sub_range.span(),
                        0,
                    );
                    return Err(if error.is_transient() {
                        FetchError::RetriesExhausted {
                            range: sub_range,
                            attempts,
                            last_completed_block,
                            source: error,
                        }
                    } else {
                        FetchError::Structural {
                            range: sub_range,
                            last_completed_block,
                            source: error,
                        }
                    });
                }
            }
        }

        Ok(FetchOutcome { range, events })
    }

    /// Run one remote call under the timeout and retry policy.
    async fn call_with_retry<T, F, O>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<(T, usize), CallFailure>
    where
        F: FnMut() -> O,
        O: Future<Output = Result<T, EventSourceError>>,
    {
        let policy = &self.config.retry_policy;
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.config.request_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(EventSourceError::transient(format!(
                    "{operation} timed out after {}ms",
                    self.config.request_timeout.as_millis()
                ))),
            };

            let err = match result {
                Ok(value) => return Ok((value, attempt)),
                Err(err) => err,
            };

            if attempt >= policy.max_attempts || !err.is_retryable() {
                return Err(CallFailure::Failed {
                    attempts: attempt,
                    error: err,
                });
            }

            let delay = match err.backoff_hint() {
                Some(hint) => backoff_delay(policy, attempt, Some(hint)),
                None => with_jitter(backoff_delay(policy, attempt, None)),
            };
            tracing::warn!(
                operation,
                attempt,
                max_attempts = policy.max_attempts,
                delay_ms = delay.as_millis(),
                error = %err,
                "Event source call failed; retrying"
            );
            iam_observability::record_event_source_retry("range_fetcher", operation);

            tokio::select! {
                _ = cancel.cancelled() => return Err(CallFailure::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

fn validate_batch(
    range: BlockRange,
    batch: Vec<EventRecord>,
) -> Result<Vec<EventRecord>, EventSourceError> {
    if let Some(stray) = batch
        .iter()
        .find(|event| event.block_number < range.from || event.block_number > range.to)
    {
        return Err(EventSourceError::structural(format!(
            "event at block {} returned for sub-range {range}",
            stray.block_number
        )));
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use iam_domain::{Address, B256};

    use super::*;
    use crate::testing::ScriptedEventSource;

    fn event(block_number: u64, log_index: u64) -> EventRecord {
        EventRecord {
            device_id: Address::repeat_byte(0x01),
            reason: "ok".to_string(),
            success: true,
            timestamp: 1_700_000_000,
            block_number,
            log_index,
            tx_hash: B256::left_padding_from(&(block_number * 100 + log_index).to_be_bytes()),
        }
    }

    fn config(max_attempts: usize) -> FetcherConfig {
        FetcherConfig {
            max_block_span: 1000,
            retry_policy: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            },
            request_timeout: Duration::from_secs(5),
        }
    }

    fn ranges(pairs: &[(u64, u64)]) -> Vec<BlockRange> {
        pairs.iter().map(|&(from, to)| BlockRange::new(from, to)).collect()
    }

    #[tokio::test]
    async fn splits_range_into_bounded_sub_ranges() {
        let source = ScriptedEventSource::new(5000).with_events([
            event(2500, 0),
            event(5, 1),
            event(1200, 0),
        ]);
        let fetcher = RangeFetcher::new(source, config(3));

        let outcome = fetcher
            .fetch(0, BlockTarget::Number(2500), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.range, BlockRange::new(0, 2500));
        assert_eq!(
            fetcher.source().queries(),
            ranges(&[(0, 999), (1000, 1999), (2000, 2500)])
        );
        let blocks: Vec<u64> = outcome.events.iter().map(|e| e.block_number).collect();
        assert_eq!(blocks, vec![5, 1200, 2500]);
        assert_eq!(fetcher.source().head_calls(), 0);
    }

    #[tokio::test]
    async fn latest_is_resolved_once() {
        let source = ScriptedEventSource::new(1500).with_events([event(1400, 0)]);
        let fetcher = RangeFetcher::new(source, config(3));

        let outcome = fetcher
            .fetch(100, BlockTarget::Latest, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.range, BlockRange::new(100, 1500));
        assert_eq!(fetcher.source().head_calls(), 1);
        assert_eq!(fetcher.source().queries(), ranges(&[(100, 1099), (1100, 1500)]));
    }

    #[tokio::test]
    async fn empty_range_does_not_query() {
        let fetcher = RangeFetcher::new(ScriptedEventSource::new(10), config(3));

        let outcome = fetcher
            .fetch(11, BlockTarget::Latest, &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.range.is_empty());
        assert!(outcome.events.is_empty());
        assert!(fetcher.source().queries().is_empty());
    }

    #[tokio::test]
    async fn transient_failure_is_retried_then_succeeds() {
        let source = ScriptedEventSource::new(2000).with_events([event(1500, 0)]);
        source.fail_query_from(1000, EventSourceError::transient("rate limited"));
        source.fail_query_from(1000, EventSourceError::transient("rate limited"));
        let fetcher = RangeFetcher::new(source, config(3));

        let outcome = fetcher
            .fetch(0, BlockTarget::Number(1999), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.events, vec![event(1500, 0)]);
        assert_eq!(
            fetcher.source().queries(),
            ranges(&[(0, 999), (1000, 1999), (1000, 1999), (1000, 1999)])
        );
    }

    #[tokio::test]
    async fn exhausted_retries_report_last_completed_boundary() {
        let source = ScriptedEventSource::new(5000);
        for _ in 0..3 {
            source.fail_query_from(2000, EventSourceError::transient("timeout"));
        }
        let fetcher = RangeFetcher::new(source, config(3));

        let err = fetcher
            .fetch(0, BlockTarget::Number(2500), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::RetriesExhausted {
                attempts: 3,
                last_completed_block: Some(1999),
                ..
            }
        ));
        assert_eq!(fetcher.source().queries().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_queries_are_retried_as_transient() {
        let source = ScriptedEventSource::new(5000);
        source.stall_queries(3);
        let fetcher = RangeFetcher::new(
            source,
            FetcherConfig {
                request_timeout: Duration::from_secs(2),
                ..config(3)
            },
        );

        let err = fetcher
            .fetch(0, BlockTarget::Number(500), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            FetchError::RetriesExhausted {
                range,
                attempts,
                last_completed_block,
                source,
            } => {
                assert_eq!(range, BlockRange::new(0, 500));
                assert_eq!(attempts, 3);
                assert_eq!(last_completed_block, None);
                assert!(source.is_transient());
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(fetcher.source().queries(), ranges(&[(0, 500); 3]));
    }

    #[tokio::test(start_paused = true)]
    async fn query_answering_after_a_timeout_succeeds() {
        let source = ScriptedEventSource::new(5000).with_events([event(42, 0)]);
        source.stall_queries(1);
        let fetcher = RangeFetcher::new(source, config(2));

        let outcome = fetcher
            .fetch(0, BlockTarget::Number(100), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.events, vec![event(42, 0)]);
        assert_eq!(fetcher.source().queries().len(), 2);
    }

    #[tokio::test]
    async fn structural_failure_is_not_retried() {
        let source = ScriptedEventSource::new(5000);
        source.fail_query_from(0, EventSourceError::structural("malformed log"));
        let fetcher = RangeFetcher::new(source, config(5));

        let err = fetcher
            .fetch(0, BlockTarget::Number(2500), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::Structural {
                last_completed_block: None,
                ..
            }
        ));
        assert_eq!(err.last_completed_block(), None);
        assert_eq!(fetcher.source().queries(), ranges(&[(0, 999)]));
    }

    #[tokio::test]
    async fn head_resolution_failure_is_reported() {
        let source = ScriptedEventSource::new(10);
        source.fail_next_head(EventSourceError::structural("bad head"));
        let fetcher = RangeFetcher::new(source, config(3));

        let err = fetcher
            .fetch(0, BlockTarget::Latest, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::HeadResolution { attempts: 1, .. }));
        assert!(fetcher.source().queries().is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_sub_range() {
        let fetcher = RangeFetcher::new(ScriptedEventSource::new(5000), config(3));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher
            .fetch(0, BlockTarget::Number(2500), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FetchError::Cancelled {
                last_completed_block: None
            }
        ));
        assert!(fetcher.source().queries().is_empty());
    }

    #[tokio::test]
    async fn provider_hint_is_honoured() {
        let source = ScriptedEventSource::new(10);
        source.fail_next_query(EventSourceError::Transient {
            reason: "slow down".to_string(),
            retry_after: Some(Duration::from_millis(20)),
        });
        let mut config = config(2);
        config.retry_policy.max_delay = Duration::from_secs(1);
        let fetcher = RangeFetcher::new(source, config);

        let started = Instant::now();
        fetcher
            .fetch(0, BlockTarget::Number(10), &CancellationToken::new())
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(fetcher.source().queries().len(), 2);
    }
}
