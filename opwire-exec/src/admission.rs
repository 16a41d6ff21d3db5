use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Bucket capacity; also the initial token count.
    pub capacity: u32,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_per_sec: 5.0,
        }
    }
}

/// Process-local token bucket pacing outbound calls, independent of the
/// remote dependency's own limits and of retry decisions.
pub struct RateLimiter {
    config: RateLimitConfig,
    bucket: Mutex<Bucket>,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let bucket = Bucket {
            tokens: config.capacity as f64,
            last_refill: Instant::now(),
        };
        Self {
            config,
            bucket: Mutex::new(bucket),
        }
    }

    /// Suspend until a token is available, then consume it. The lock is only
    /// held for bookkeeping, never across the sleep, so unrelated concurrent
    /// calls are not blocked.
    pub async fn acquire(&self) {
        loop {
            match self.take_or_wait() {
                None => return,
                Some(wait) => tokio::time::sleep(wait).await,
            }
        }
    }

    /// Consume a token if one is available right now.
    pub fn try_acquire(&self) -> bool {
        self.take_or_wait().is_none()
    }

    pub fn available(&self) -> f64 {
        let mut bucket = self.lock_bucket();
        self.refill(&mut bucket);
        bucket.tokens
    }

    fn take_or_wait(&self) -> Option<Duration> {
        let mut bucket = self.lock_bucket();
        self.refill(&mut bucket);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            None
        } else {
            let deficit = 1.0 - bucket.tokens;
            Some(Duration::from_secs_f64(
                deficit / self.config.refill_per_sec.max(f64::MIN_POSITIVE),
            ))
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.config.refill_per_sec)
            .min(self.config.capacity as f64);
        bucket.last_refill = now;
    }

    fn lock_bucket(&self) -> std::sync::MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(|e| e.into_inner())
    }
}
