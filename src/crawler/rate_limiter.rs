//! Shared outbound request pacing
//!
//! One token bucket covers every fetch the crawl makes, regardless of the
//! priority of the URL being fetched.

use crate::config::RateLimitConfig;
use crate::CrawlError;
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use tokio_util::sync::CancellationToken;

type DirectLimiter = Governor<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Token-bucket limiter shared by all workers
pub struct RateLimiter {
    limiter: DirectLimiter,
}

impl RateLimiter {
    /// Creates a limiter with a sustained rate and a burst size
    ///
    /// Zero values are raised to one; config validation rejects them earlier.
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: Governor::direct(Quota::per_second(rate).allow_burst(burst)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst)
    }

    /// Waits for a token
    ///
    /// Returns `CrawlError::Cancelled` as soon as the token is cancelled, even
    /// if a permit would be available; the caller must then skip its fetch.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), CrawlError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CrawlError::Cancelled),
            _ = self.limiter.until_ready() => Ok(()),
        }
    }
}
