use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::EventSourceError;

/// Bounded exponential backoff for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn rpc_default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::rpc_default()
    }
}

/// Config-file form of [`RetryPolicy`], in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryPolicyRaw {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl From<RetryPolicy> for RetryPolicyRaw {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

pub(crate) trait RetryableError: std::fmt::Display {
    fn is_retryable(&self) -> bool;
    fn backoff_hint(&self) -> Option<Duration> {
        None
    }
}

impl RetryableError for EventSourceError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    fn backoff_hint(&self) -> Option<Duration> {
        self.retry_after()
    }
}

/// Delay before retrying after failed attempt number `attempt` (1-based).
///
/// A provider hint replaces the exponential schedule; both are capped at
/// `max_delay`.
pub(crate) fn backoff_delay(
    policy: &RetryPolicy,
    attempt: usize,
    hint: Option<Duration>,
) -> Duration {
    if let Some(hint) = hint {
        return hint.min(policy.max_delay);
    }

    let base_ms = policy.base_delay.as_millis() as u64;
    let exponent = (attempt.saturating_sub(1)).min(6) as u32;
    let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    let delay_ms = base_ms.saturating_mul(factor);
    let max_ms = policy.max_delay.as_millis() as u64;

    Duration::from_millis(delay_ms.min(max_ms))
}

/// Spread a computed delay over `[delay / 2, delay]`.
pub(crate) fn with_jitter(delay: Duration) -> Duration {
    let millis = delay.as_millis() as u64;
    if millis < 2 {
        return delay;
    }
    let half = millis / 2;
    Duration::from_millis(half + rand::thread_rng().gen_range(0..=millis - half))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = policy();
        let delays: Vec<u128> = (1..=6)
            .map(|attempt| backoff_delay(&policy, attempt, None).as_millis())
            .collect();

        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn provider_hint_overrides_schedule_but_respects_cap() {
        let policy = policy();

        assert_eq!(
            backoff_delay(&policy, 1, Some(Duration::from_millis(700))),
            Duration::from_millis(700)
        );
        assert_eq!(
            backoff_delay(&policy, 1, Some(Duration::from_secs(60))),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn jitter_stays_within_half_and_full_delay() {
        let delay = Duration::from_millis(400);
        for _ in 0..100 {
            let jittered = with_jitter(delay);
            assert!(jittered >= Duration::from_millis(200));
            assert!(jittered <= delay);
        }
        assert_eq!(with_jitter(Duration::ZERO), Duration::ZERO);
    }
}
