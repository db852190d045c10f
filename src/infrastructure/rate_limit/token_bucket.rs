//! Token buckets for outbound provider calls
//!
//! Each upstream provider gets one bucket sized to its published limit,
//! including sub-1/sec rates expressed as fractional capacity. A denial is
//! immediate and final for that call; the bucket never queues or blocks.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Fractional-rate token bucket
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Refill rate in tokens per second
    rate: f64,
    /// Maximum stored tokens; at least one whole permit so fractional rates
    /// can ever fire
    burst: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a bucket refilling at `rate` tokens per second, starting full.
    pub fn new(rate: f64) -> Self {
        let rate = rate.max(0.0);
        let burst = rate.max(1.0);

        Self {
            rate,
            burst,
            tokens: burst,
            last_refill: Instant::now(),
        }
    }

    /// Spend one permit if available.
    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    /// [`allow`](Self::allow) with an explicit clock, for deterministic tests
    /// and simulation.
    pub fn allow_at(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Refill rate in tokens per second
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

/// One bucket per external provider key
#[derive(Debug, Default)]
pub struct TokenBucketRegistry {
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl TokenBucketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider's published rate, replacing any existing bucket.
    pub fn register(&self, provider_key: impl Into<String>, rate: f64) {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        buckets.insert(provider_key.into(), TokenBucket::new(rate));
    }

    /// Spend a permit for `provider_key`.
    ///
    /// Providers without a registered bucket are unthrottled and always
    /// allowed.
    pub fn allow(&self, provider_key: &str) -> bool {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match buckets.get_mut(provider_key) {
            Some(bucket) => bucket.allow(),
            None => true,
        }
    }
}
