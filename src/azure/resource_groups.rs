//! Resource Groups
//!
//! Listing resource groups, and resolving a connection's resource group
//! scope against that listing.

use super::client::ArmClient;
use crate::cancel::CancelSignal;
use crate::error::ApiError;
use crate::scope::{QueryScope, ResolvedScope, ResourceGroupFilterConfig};
use serde_json::Value;

/// api-version for Microsoft.Resources/resourceGroups
pub const RESOURCE_GROUPS_API_VERSION: &str = "2021-04-01";

/// Resource group information
#[derive(Debug, Clone)]
pub struct ResourceGroup {
    pub id: String,
    pub name: String,
    pub location: String,
    pub provisioning_state: String,
}

impl From<&Value> for ResourceGroup {
    fn from(value: &Value) -> Self {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string()
        };
        Self {
            id: field("id"),
            name: field("name"),
            location: field("location"),
            provisioning_state: value
                .get("properties")
                .and_then(|p| p.get("provisioningState"))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_string(),
        }
    }
}

/// List every resource group in the client's subscription, following `nextLink`
pub async fn list_resource_groups(
    client: &ArmClient,
    cancel: &CancelSignal,
) -> Result<Vec<ResourceGroup>, ApiError> {
    let tags = client.call_tags("Microsoft.Resources", "resourceGroups/read");
    let mut url = client.subscription_url("resourcegroups", RESOURCE_GROUPS_API_VERSION)?;

    let mut groups = Vec::new();
    loop {
        let page = client.get(&url, &tags, cancel).await?;

        if let Some(items) = page.get("value").and_then(|v| v.as_array()) {
            groups.extend(items.iter().map(ResourceGroup::from));
        }

        match page.get("nextLink").and_then(|v| v.as_str()) {
            Some(next) if !next.is_empty() => url = next.to_string(),
            _ => break,
        }
    }

    tracing::debug!("Listed {} resource groups in {}", groups.len(), client.subscription_id);
    Ok(groups)
}

/// Get resource group names as a simple list
pub async fn list_resource_group_names(
    client: &ArmClient,
    cancel: &CancelSignal,
) -> Result<Vec<String>, ApiError> {
    let groups = list_resource_groups(client, cancel).await?;
    Ok(groups.into_iter().map(|g| g.name).collect())
}

/// Resolve the connection's resource group scope once for this query
pub async fn resolve_scope<'a>(
    client: &ArmClient,
    query: &'a QueryScope,
    filter: &ResourceGroupFilterConfig,
    cancel: &CancelSignal,
) -> Result<&'a ResolvedScope, ApiError> {
    query
        .resolve(filter, || list_resource_group_names(client, cancel))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_group_from_json() {
        let value = json!({
            "id": "/subscriptions/s/resourceGroups/prod-a",
            "name": "prod-a",
            "location": "westeurope",
            "properties": { "provisioningState": "Succeeded" }
        });
        let rg = ResourceGroup::from(&value);
        assert_eq!(rg.name, "prod-a");
        assert_eq!(rg.location, "westeurope");
        assert_eq!(rg.provisioning_state, "Succeeded");
    }

    #[test]
    fn test_resource_group_missing_fields() {
        let rg = ResourceGroup::from(&json!({}));
        assert_eq!(rg.name, "-");
        assert_eq!(rg.provisioning_state, "Unknown");
    }
}
