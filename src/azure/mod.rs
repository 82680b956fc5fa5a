//! Azure Resource Manager interaction module
//!
//! The cloud API collaborators the resilience layer sits in front of:
//! an HTTP wrapper, a client that rate-limits and retries every call, and
//! the resource group listing used for scope resolution.
//!
//! # Module Structure
//!
//! - [`client`] - Main ARM client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//! - [`resource_groups`] - Resource group listing and scope resolution
//!
//! # Example
//!
//! ```ignore
//! use azinv::azure::{client::ArmClient, resource_groups};
//! use azinv::cancel::CancelSignal;
//!
//! async fn example(config: &azinv::config::ConnectionConfig) -> anyhow::Result<()> {
//!     let client = ArmClient::new(config, "token")?;
//!     let groups = resource_groups::list_resource_group_names(&client, &CancelSignal::never()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod http;
pub mod resource_groups;
