//! Process-global throttle for explorer traffic: a token bucket for request
//! rate plus a semaphore bounding in-flight calls. Semaphore waiters are
//! served FIFO, so queued callers cannot starve each other.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::error::ServiceError;

pub struct UpstreamRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    concurrency: Semaphore,
}

/// Holding one of these is the right to have a single upstream call in
/// flight; the slot frees on drop.
pub struct UpstreamPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

impl UpstreamRateLimiter {
    pub fn new(tokens_per_sec: u32, max_concurrent: usize) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(tokens_per_sec.max(1)).unwrap());
        Self {
            limiter: RateLimiter::direct(quota),
            concurrency: Semaphore::new(max_concurrent.max(1)),
        }
    }

    /// Wait for a concurrency slot, then for a rate token.
    pub async fn acquire(&self) -> Result<UpstreamPermit<'_>, ServiceError> {
        let permit = self
            .concurrency
            .acquire()
            .await
            .map_err(|_| ServiceError::Internal("rate limiter semaphore closed".to_string()))?;
        self.limiter.until_ready().await;
        Ok(UpstreamPermit { _permit: permit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn serializes_in_flight_calls() {
        let limiter = Arc::new(UpstreamRateLimiter::new(1000, 1));

        let first = limiter.acquire().await.unwrap();
        // With one slot, a second acquire must not complete while the first
        // permit is alive.
        let second = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            limiter.acquire(),
        )
        .await;
        assert!(second.is_err(), "second permit granted while first held");

        drop(first);
        let third = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            limiter.acquire(),
        )
        .await;
        assert!(third.is_ok(), "permit not released on drop");
    }
}
