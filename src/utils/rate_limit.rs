//! Minimum spacing between outbound network requests.

use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

/// Default spacing between two network requests.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Single-slot limiter that spaces consecutive network requests by at least
/// `min_interval`, measured from the completion of the previous request.
///
/// This is not a token bucket: it only enforces spacing. Cache hits never
/// touch it, and separate limiters do not coordinate.
#[derive(Debug)]
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a limiter with no previous request recorded
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a network request may be issued.
    ///
    /// The returned permit keeps the limiter locked until the request
    /// completes, so two tasks can never both observe the limiter as idle.
    /// Call [`RequestPermit::complete`] once the round trip finished; a
    /// permit dropped without completing leaves the previous timestamp.
    pub async fn before_request(&self) -> RequestPermit<'_> {
        let guard = self.last_request.lock().await;
        if let Some(last) = *guard {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!("Rate limit: sleeping for {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
        RequestPermit { guard }
    }

    /// Completion time of the last network request
    pub async fn last_request(&self) -> Option<Instant> {
        *self.last_request.lock().await
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

/// Exclusive right to perform one network request
#[derive(Debug)]
pub struct RequestPermit<'a> {
    guard: MutexGuard<'a, Option<Instant>>,
}

impl RequestPermit<'_> {
    /// Record that the network round trip has completed
    pub fn complete(mut self) {
        *self.guard = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let start = Instant::now();
        limiter.before_request().await.complete();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(limiter.last_request().await.is_some());
    }

    #[tokio::test]
    async fn test_consecutive_requests_are_spaced() {
        let interval = Duration::from_millis(100);
        let limiter = RateLimiter::new(interval);

        limiter.before_request().await.complete();
        let first_done = Instant::now();
        let permit = limiter.before_request().await;
        assert!(first_done.elapsed() >= interval - Duration::from_millis(5));
        permit.complete();
    }

    #[tokio::test]
    async fn test_dropped_permit_does_not_advance() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        drop(limiter.before_request().await);
        assert!(limiter.last_request().await.is_none());

        let start = Instant::now();
        limiter.before_request().await.complete();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_concurrent_tasks_do_not_share_a_slot() {
        let interval = Duration::from_millis(80);
        let limiter = Arc::new(RateLimiter::new(interval));
        let start = Instant::now();

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    limiter.before_request().await.complete();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // Three requests need two full gaps between them
        assert!(start.elapsed() >= interval * 2);
    }
}
