use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::core::oracle::Throttle;

/// Build a reqwest client with sane defaults (short connect timeout, bounded request time).
pub fn make_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(2))
        .timeout(Duration::from_secs(6))
        .build()
        .unwrap_or_default()
}

/// Enforces a minimum interval between oracle invocations.
///
/// The lock is held across the sleep so concurrent callers queue behind each
/// other instead of all reading the same stale timestamp.
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    last_invocation: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_invocation: Mutex::new(None),
        }
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub async fn await_slot(&self) {
        let mut last = self.last_invocation.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                let wait = self.min_delay - elapsed;
                tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limiting: sleeping");
                tokio::time::sleep(wait).await;
            }
        }
        // Stamp after the sleep so a slow wait does not shorten the next interval.
        *last = Some(Instant::now());
    }

    pub async fn reset(&self) {
        *self.last_invocation.lock().await = None;
    }
}

#[async_trait]
impl Throttle for RateLimiter {
    async fn await_slot(&self) {
        RateLimiter::await_slot(self).await
    }

    async fn reset(&self) {
        RateLimiter::reset(self).await
    }
}
