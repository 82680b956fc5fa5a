//! Retry handling for cloud API calls
//!
//! - [`policy`] - backoff computation per connection
//! - [`executor`] - the retry loop that applies it

pub mod executor;
pub mod policy;

pub use executor::execute;
pub use policy::{decide, ConnectionRetryConfig, RetryDecision, RetryPolicy, MAX_DELAY};
