//! Waiting between mirror attempts.
//!
//! Retry delays go through a [`Timer`] and the steady-state sync cadence
//! through a [`SyncLimiter`], so both can be replaced in tests.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Returned when a wait is interrupted by shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mirror cancelled")]
pub struct Cancelled;

#[async_trait]
pub trait Timer: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed delay between attempts, with no attempt limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
}

impl RetryPolicy {
    pub const fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait out the delay before the next attempt.
    pub async fn wait(
        &self,
        timer: &dyn Timer,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        tokio::select! {
            _ = timer.sleep(self.delay) => Ok(()),
            _ = cancel.cancelled() => Err(Cancelled),
        }
    }
}

/// Gate admitting one sync iteration at a time.
#[async_trait]
pub trait SyncLimiter: Send + Sync {
    async fn until_ready(&mut self);
}

/// Token bucket with a burst of one: the first iteration runs immediately,
/// later ones at most once per `interval`.
pub struct TokenBucket {
    limiter: DefaultDirectRateLimiter,
}

impl TokenBucket {
    pub fn every(interval: Duration) -> Self {
        let quota = Quota::with_period(interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
            .allow_burst(NonZeroU32::MIN);

        Self {
            limiter: RateLimiter::direct(quota),
        }
    }
}

#[async_trait]
impl SyncLimiter for TokenBucket {
    async fn until_ready(&mut self) {
        self.limiter.until_ready().await;
    }
}
