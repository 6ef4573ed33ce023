//! Token bucket rate limiting
//!
//! One limiter is shared (via `Arc`) by every run that talks to the same
//! provider. Counter updates happen under a mutex, so concurrent runs see a
//! consistent bucket. Time is read from the tokio clock, so a paused test
//! runtime drives refills deterministically.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket with capacity `C` refilled at `r` tokens per second
#[derive(Debug)]
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_rate: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucketLimiter {
    /// Create a full bucket
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_rate: refill_rate.max(f64::MIN_POSITIVE),
            bucket: Mutex::new(Bucket {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
            }),
        }
    }

    /// `rpm` requests per minute: capacity `rpm`, refill `rpm / 60` per second
    pub fn per_minute(rpm: u32) -> Self {
        Self::new(rpm, f64::from(rpm) / 60.0)
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Take `n` tokens if available
    pub fn consume(&self, n: u32) -> bool {
        self.consume_at(n, Instant::now())
    }

    /// Time until `n` tokens will be available
    pub fn wait_time(&self, n: u32) -> Duration {
        self.wait_time_at(n, Instant::now())
    }

    /// Tokens currently available
    pub fn available(&self) -> f64 {
        self.available_at(Instant::now())
    }

    /// [`consume`](Self::consume) evaluated at an explicit instant
    pub fn consume_at(&self, n: u32, now: Instant) -> bool {
        let mut bucket = self.lock();
        self.refill(&mut bucket, now);

        let wanted = f64::from(n);
        if bucket.tokens >= wanted {
            bucket.tokens -= wanted;
            true
        } else {
            false
        }
    }

    /// [`wait_time`](Self::wait_time) evaluated at an explicit instant
    pub fn wait_time_at(&self, n: u32, now: Instant) -> Duration {
        let mut bucket = self.lock();
        self.refill(&mut bucket, now);

        let wanted = f64::from(n);
        if bucket.tokens >= wanted {
            Duration::ZERO
        } else {
            // a near-zero refill rate overflows Duration
            Duration::try_from_secs_f64((wanted - bucket.tokens) / self.refill_rate).unwrap_or(Duration::MAX)
        }
    }

    /// [`available`](Self::available) evaluated at an explicit instant
    pub fn available_at(&self, now: Instant) -> f64 {
        let mut bucket = self.lock();
        self.refill(&mut bucket, now);
        bucket.tokens
    }

    /// Wait until `n` tokens can be taken, then take them. `n` is capped at
    /// the bucket capacity.
    pub async fn acquire(&self, n: u32) {
        let n = n.min(self.capacity as u32);
        loop {
            if self.consume(n) {
                return;
            }
            let wait = self.wait_time(n);
            debug!(wait_ms = wait.as_millis() as u64, "Rate limited, waiting for tokens");
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        if elapsed.is_zero() {
            return;
        }
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        bucket.last_refill = now;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
