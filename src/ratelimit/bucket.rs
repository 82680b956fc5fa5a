//! Token buckets
//!
//! One bucket per (limiter, scope values) tuple, created lazily and kept for
//! the life of the process. Each bucket carries its own lock so unrelated
//! scopes never contend.

use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use super::selector::CallTags;

/// Identifies one live token bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    limiter: String,
    scope: Vec<(String, String)>,
}

impl BucketKey {
    /// Build the key from a limiter's scope dimensions and the call's tags.
    ///
    /// Values are trimmed and lower-cased; a missing tag becomes an empty value.
    pub fn derive(limiter: &str, dimensions: &[String], tags: &CallTags) -> Self {
        let scope = dimensions
            .iter()
            .map(|dim| {
                let value = tags.get(dim).unwrap_or_default().trim().to_lowercase();
                (dim.clone(), value)
            })
            .collect();

        Self {
            limiter: limiter.to_string(),
            scope,
        }
    }

    pub fn limiter(&self) -> &str {
        &self.limiter
    }

    pub fn scope(&self) -> &[(String, String)] {
        &self.scope
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.limiter)?;
        for (dim, value) in &self.scope {
            write!(f, " {}={}", dim, value)?;
        }
        Ok(())
    }
}

/// A simple token bucket rate limiter.
#[derive(Debug)]
pub struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    /// Start full
    pub fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// Take one token, or report how long until one is available
    pub fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> Result<(), Duration> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::try_from_secs_f64(deficit / refill_rate).unwrap_or(Duration::MAX))
        }
    }

    pub fn available(&self) -> f64 {
        self.tokens
    }
}

/// Concurrent map of live buckets
#[derive(Debug, Default)]
pub struct TokenBuckets {
    buckets: DashMap<BucketKey, Arc<Mutex<TokenBucket>>>,
}

impl TokenBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take a token from the keyed bucket, creating it full if new
    pub fn try_acquire(
        &self,
        key: &BucketKey,
        capacity: f64,
        refill_rate: f64,
    ) -> Result<(), Duration> {
        let bucket = self
            .buckets
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(TokenBucket::new(capacity))))
            .clone();

        // A poisoned bucket only means another caller panicked mid-update; the
        // counters are still meaningful.
        let mut bucket = bucket.lock().unwrap_or_else(|e| e.into_inner());
        bucket.try_acquire(capacity, refill_rate)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
