//! Resilience and scoping layer for Azure inventory collectors
//!
//! Every collector that lists or fetches an Azure resource type goes through
//! three pieces before it touches the network:
//!
//! - [`retry`] - exponential backoff with jitter for transient failures
//! - [`ratelimit`] - named token-bucket limiters partitioned by scope
//! - [`scope`] - expansion of resource group filters, wildcards included
//!
//! [`azure`] holds the ARM client these are wired into.

pub mod azure;
pub mod cancel;
pub mod config;
pub mod error;
pub mod ratelimit;
pub mod retry;
pub mod scope;

pub use error::ApiError;
