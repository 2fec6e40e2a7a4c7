//! Bounded exponential-backoff retry for the send call.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retry schedule: up to `max_attempts` tries, doubling the delay
/// between consecutive attempts starting from `base_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay inserted after failed attempt `attempt` (zero-based).
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    /// Run `operation` until it succeeds or the attempt budget is spent.
    ///
    /// At least one attempt is always made. Delays only separate
    /// attempts; exhaustion returns the final error immediately.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_secs = delay.as_secs_f64(),
                        error = %e,
                        "Attempt failed; backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn call_counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[tokio::test]
    async fn first_success_needs_no_retry() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let calls = call_counter();
        let counter = Arc::clone(&calls);

        let start = Instant::now();
        let result: Result<u32, String> = policy
            .run(move || {
                let counter = Arc::clone(&counter);
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
            })
            .await;

        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        let calls = call_counter();
        let counter = Arc::clone(&calls);

        let start = Instant::now();
        let result = policy
            .run(move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n <= 2 { Err(format!("failure {n}")) } else { Ok(n) }
                }
            })
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // two backoffs: 10ms + 20ms
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn exhaustion_returns_the_final_error() {
        let policy = RetryPolicy::new(3, Duration::from_millis(5));
        let calls = call_counter();
        let counter = Arc::clone(&calls);

        let result: Result<u32, String> = policy
            .run(move || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(format!("failure {n}"))
                }
            })
            .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn backoff_doubles_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(20));
        let attempt_times = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = Arc::clone(&attempt_times);

        let _: Result<(), String> = policy
            .run(move || {
                let recorder = Arc::clone(&recorder);
                async move {
                    recorder.lock().unwrap().push(Instant::now());
                    Err("nope".to_string())
                }
            })
            .await;

        let times = attempt_times.lock().unwrap();
        assert_eq!(times.len(), 3);
        assert!(times[1] - times[0] >= Duration::from_millis(20));
        assert!(times[2] - times[1] >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn no_delay_after_the_final_attempt() {
        let policy = RetryPolicy::new(2, Duration::from_millis(50));

        let start = Instant::now();
        let _: Result<(), String> = policy
            .run(|| async { Err("nope".to_string()) })
            .await;

        // one backoff between the two attempts, nothing after the last
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(200));
    }
}
