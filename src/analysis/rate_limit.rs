// Token-bucket rate limiter and per-dependency pools.
//
// Every external dependency gets its own bounded-concurrency pool plus an
// optional requests-per-second ceiling. The limiter uses a simple
// token-bucket approach: one token per interval, each request consumes one.
// If no token is available, we sleep until one is.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Duration, Instant};

use crate::config::PipelineLimits;

/// A simple rate limiter that enforces a maximum request rate.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

struct RateLimiterInner {
    /// Minimum time between requests
    interval: Duration,
    /// When the last request was allowed through
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter that allows `requests_per_second` requests per second.
    pub fn new(requests_per_second: f64) -> Self {
        let interval = Duration::from_secs_f64(1.0 / requests_per_second);
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                interval,
                last_request: None,
            })),
        }
    }

    /// Wait until a request is allowed, then return.
    ///
    /// If we're within the rate limit, this returns immediately.
    /// If we need to wait, it sleeps for the appropriate duration.
    pub async fn acquire(&self) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        if let Some(last) = inner.last_request {
            let elapsed = now.duration_since(last);
            if elapsed < inner.interval {
                let sleep_time = inner.interval - elapsed;
                // Drop the lock before sleeping so other tasks aren't blocked
                drop(inner);
                tokio::time::sleep(sleep_time).await;
                // Re-acquire after sleeping
                inner = self.inner.lock().await;
            }
        }

        inner.last_request = Some(Instant::now());
    }
}

/// Concurrency bound plus optional rate ceiling for one external dependency.
#[derive(Clone)]
pub struct Pool {
    semaphore: Arc<Semaphore>,
    limiter: Option<RateLimiter>,
}

impl Pool {
    pub fn new(concurrency: usize, requests_per_second: Option<f64>) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            limiter: requests_per_second.map(RateLimiter::new),
        }
    }

    /// Wait for a concurrency slot and (if rated) a token, then return the
    /// permit. The slot is held until the permit is dropped.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| anyhow::anyhow!("Pool semaphore closed"))?;
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
        Ok(permit)
    }
}

/// One pool per external dependency, built from the configured limits.
#[derive(Clone)]
pub struct AnalysisPools {
    pub video: Pool,
    pub image: Pool,
    pub brand: Pool,
    pub scrape: Pool,
}

impl AnalysisPools {
    pub fn from_limits(limits: &PipelineLimits) -> Self {
        Self {
            video: Pool::new(limits.video_concurrency, Some(limits.video_rps)),
            image: Pool::new(limits.image_concurrency, Some(limits.image_rps)),
            brand: Pool::new(limits.brand_concurrency, None),
            scrape: Pool::new(limits.scrape_concurrency, None),
        }
    }
}

impl Default for AnalysisPools {
    fn default() -> Self {
        Self::from_limits(&PipelineLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_allows_first_request_immediately() {
        let limiter = RateLimiter::new(1.0); // 1 QPS
        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        // First request should be near-instant
        assert!(elapsed < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_rate_limiter_delays_second_request() {
        let limiter = RateLimiter::new(2.0); // 2 QPS = 500ms between requests
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        let elapsed = start.elapsed();
        // Second request should wait ~500ms
        assert!(
            elapsed >= Duration::from_millis(400),
            "Expected ~500ms delay, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let pool = Pool::new(2, None);
        let p1 = pool.acquire().await.unwrap();
        let _p2 = pool.acquire().await.unwrap();

        // Third acquire should block until a permit is released
        let pool2 = pool.clone();
        let blocked = tokio::spawn(async move { pool2.acquire().await.unwrap() });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        drop(p1);
        let _p3 = blocked.await.unwrap();
    }
}
