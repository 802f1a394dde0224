//! Token bucket rate limiter for outbound model requests.
//!
//! Tokens refill continuously with elapsed time:
//! `tokens = min(tokens + elapsed_seconds * refill_rate, capacity)`.
//! Acquiring waits until at least one token is available, then consumes it.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Token bucket limiter; capacity equals the sustained refill rate.
#[derive(Clone)]
pub struct TokenBucketRateLimiter {
    tokens: Arc<Mutex<f64>>,
    capacity: f64,
    refill_rate: f64,
    last_refill: Arc<Mutex<Instant>>,
}

impl TokenBucketRateLimiter {
    /// Create a limiter allowing `requests_per_second` sustained requests.
    ///
    /// # Panics
    /// Panics when `requests_per_second` is not positive.
    pub fn new(requests_per_second: f64) -> Self {
        assert!(
            requests_per_second > 0.0,
            "requests_per_second must be positive"
        );
        Self {
            tokens: Arc::new(Mutex::new(requests_per_second)),
            capacity: requests_per_second,
            refill_rate: requests_per_second,
            last_refill: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Wait until a token is available and consume it.
    pub async fn acquire(&self) {
        loop {
            if self.try_acquire().await {
                return;
            }
            // Sleep for roughly the time one token takes to refill.
            let wait_ms = (1000.0 / self.refill_rate).ceil().max(1.0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            sleep(Duration::from_millis(wait_ms as u64)).await;
        }
    }

    /// Consume a token if one is available right now.
    pub async fn try_acquire(&self) -> bool {
        self.refill().await;
        let mut tokens = self.tokens.lock().await;
        if *tokens >= 1.0 {
            *tokens -= 1.0;
            true
        } else {
            false
        }
    }

    async fn refill(&self) {
        let mut last = self.last_refill.lock().await;
        let elapsed = last.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let mut tokens = self.tokens.lock().await;
            *tokens = (*tokens + elapsed * self.refill_rate).min(self.capacity);
            *last = Instant::now();
        }
    }
}
