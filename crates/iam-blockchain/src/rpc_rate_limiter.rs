use std::num::NonZeroU32;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};

/// Caps outgoing RPC requests per second. Without a limit every call passes
/// through immediately.
pub(crate) struct RpcRateLimiter {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RpcRateLimiter {
    pub(crate) fn new(requests_per_second: Option<u32>) -> Self {
        let limiter = requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Self { limiter }
    }

    pub(crate) fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    pub(crate) async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unlimited_and_zero_limits_pass_through() {
        let unlimited = RpcRateLimiter::new(None);
        let zero = RpcRateLimiter::new(Some(0));

        assert!(!unlimited.is_limited());
        assert!(!zero.is_limited());
        unlimited.acquire().await;
        zero.acquire().await;
    }

    #[tokio::test]
    async fn configured_limit_admits_first_request() {
        let limiter = RpcRateLimiter::new(Some(10));

        assert!(limiter.is_limited());
        limiter.acquire().await;
    }
}
