//! Rolling-window rate limiter for outbound send attempts.
//!
//! Callers that would exceed the window are delayed until it admits
//! them, never rejected. The budget is global: every send attempt,
//! retries included, takes a slot.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Rolling-window counter: at most `max_calls` acquisitions per `window`.
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Take a slot, waiting for the window to admit one if necessary.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.timestamps.lock().await;
                let now = Instant::now();
                while stamps
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.window)
                {
                    stamps.pop_front();
                }
                if stamps.len() < self.max_calls {
                    stamps.push_back(now);
                    return;
                }
                // Window full; wait out the oldest entry and re-check.
                stamps
                    .front()
                    .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                    .unwrap_or(Duration::ZERO)
            };
            debug!(wait_ms = wait.as_millis() as u64, "Send budget exhausted; waiting for window");
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_the_limit_immediately() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn delays_when_the_window_is_full() {
        let limiter = RateLimiter::new(2, Duration::from_millis(200));

        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn slots_free_up_as_the_window_slides() {
        let limiter = RateLimiter::new(1, Duration::from_millis(200));

        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(250)).await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn never_exceeds_the_budget_in_any_window() {
        let limiter = RateLimiter::new(2, Duration::from_millis(150));

        let start = Instant::now();
        for _ in 0..6 {
            limiter.acquire().await;
        }

        // six acquisitions at two per 150ms need at least two full windows
        assert!(start.elapsed() >= Duration::from_millis(290));
    }
}
