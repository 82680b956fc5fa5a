//! Rate limiting for cloud API calls
//!
//! Different ARM services throttle very differently, so call budget is split
//! into named limiters, each with its own refill rate, burst and scope.
//!
//! # Module Structure
//!
//! - [`selector`] - predicates over a call's `service`/`action` tags
//! - [`registry`] - built-in limiter definitions loaded from embedded JSON
//! - [`bucket`] - bucket keys and the concurrent token-bucket map
//! - [`limiter`] - gates a call on every matching limiter

pub mod bucket;
pub mod limiter;
pub mod registry;
pub mod selector;

pub use bucket::{BucketKey, TokenBuckets};
pub use limiter::{shared_rate_limiter, RateLimiter};
pub use registry::{get_registry, RateLimiterDefinition, RateLimiterRegistry};
pub use selector::{CallTags, Selector};
