//! Rate Limiter
//!
//! Gates outgoing calls on every limiter definition their tags match.

use super::bucket::TokenBuckets;
use super::registry::{get_registry, RateLimiterRegistry};
use super::selector::CallTags;
use crate::cancel::CancelSignal;
use crate::error::ApiError;
use std::sync::{Arc, OnceLock};

/// Registry plus the live buckets it governs
#[derive(Debug)]
pub struct RateLimiter {
    registry: &'static RateLimiterRegistry,
    buckets: TokenBuckets,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(get_registry())
    }
}

/// Process-wide limiter over the built-in registry
static SHARED: OnceLock<Arc<RateLimiter>> = OnceLock::new();

/// The limiter every client uses unless given its own.
///
/// Buckets live here for the life of the process, so separately built clients
/// for the same connection draw from the same quota.
pub fn shared_rate_limiter() -> Arc<RateLimiter> {
    SHARED
        .get_or_init(|| Arc::new(RateLimiter::default()))
        .clone()
}

impl RateLimiter {
    pub fn new(registry: &'static RateLimiterRegistry) -> Self {
        Self {
            registry,
            buckets: TokenBuckets::new(),
        }
    }

    pub fn registry(&self) -> &RateLimiterRegistry {
        self.registry
    }

    /// Number of buckets created so far
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Wait until every matching limiter admits the call.
    ///
    /// A call no limiter matches goes straight through.
    pub async fn acquire(&self, tags: &CallTags, cancel: &CancelSignal) -> Result<(), ApiError> {
        for def in self.registry.matching(tags) {
            let key = def.bucket_key(tags);

            loop {
                if cancel.is_cancelled() {
                    return Err(ApiError::Cancelled);
                }

                match self.buckets.try_acquire(&key, def.bucket_size, def.fill_rate) {
                    Ok(()) => break,
                    Err(wait) => {
                        tracing::debug!("Rate limited on {}, waiting {:?}", key, wait);
                        tokio::select! {
                            _ = tokio::time::sleep(wait) => {}
                            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
