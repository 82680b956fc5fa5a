//! Resource group scoping
//!
//! - [`resolver`] - expands resource group filters into a concrete scope
//! - [`glob`] - `*` / `?` wildcard matching
//! - [`resource_id`] - pull names out of ARM resource IDs

pub mod glob;
pub mod resolver;
pub mod resource_id;

pub use resolver::{resolve, QueryScope, ResolvedScope, ResourceGroupFilterConfig};
pub use resource_id::{resource_group_from_id, subscription_from_id};
