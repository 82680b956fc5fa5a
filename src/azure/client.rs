//! ARM Client
//!
//! Main client for interacting with Azure Resource Manager, combining the
//! HTTP wrapper with rate limiting and retries.

use super::http::ArmHttpClient;
use crate::cancel::CancelSignal;
use crate::config::ConnectionConfig;
use crate::error::ApiError;
use crate::ratelimit::{shared_rate_limiter, CallTags, RateLimiter};
use crate::retry::{self, RetryPolicy};
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Main ARM client, one per connection
#[derive(Clone)]
pub struct ArmClient {
    pub http: ArmHttpClient,
    pub subscription_id: String,
    connection: String,
    token: String,
    base_url: String,
    retry: RetryPolicy,
    limiter: Arc<RateLimiter>,
}

impl ArmClient {
    /// Create a client for a connection using an already-acquired bearer token
    pub fn new(config: &ConnectionConfig, token: &str) -> Result<Self> {
        let subscription_id = config
            .effective_subscription()
            .ok_or_else(|| {
                anyhow!("No subscription configured (set subscription_id or AZURE_SUBSCRIPTION_ID)")
            })?;

        Ok(Self {
            http: ArmHttpClient::new()?,
            subscription_id,
            connection: config.connection_name().to_string(),
            token: token.to_string(),
            base_url: config.environment.arm_endpoint().to_string(),
            retry: RetryPolicy::from_config(&config.retry_config()),
            limiter: shared_rate_limiter(),
        })
    }

    /// Point at a different ARM endpoint
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Use a dedicated rate limiter instead of the process-wide one
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Tags for a call made by this connection against its subscription
    pub fn call_tags(&self, service: &str, action: &str) -> CallTags {
        CallTags::new()
            .with("connection", &self.connection)
            .with("subscription", &self.subscription_id)
            .with("service", service)
            .with("action", action)
    }

    /// Make a rate-limited, retried GET request to an ARM API
    pub async fn get(
        &self,
        url: &str,
        tags: &CallTags,
        cancel: &CancelSignal,
    ) -> Result<Value, ApiError> {
        let token = self.token.as_str();
        retry::execute(&self.retry, cancel, || async move {
            self.limiter.acquire(tags, cancel).await?;
            self.http.get(url, token).await
        })
        .await
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    /// Build a subscription-scoped ARM URL with its api-version
    pub fn subscription_url(&self, path: &str, api_version: &str) -> Result<String, url::ParseError> {
        let raw = format!(
            "{}/subscriptions/{}/{}",
            self.base_url,
            self.subscription_id,
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&raw)?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url.into())
    }

    /// Build a resource-group-scoped ARM URL with its api-version
    pub fn resource_group_url(
        &self,
        resource_group: &str,
        path: &str,
        api_version: &str,
    ) -> Result<String, url::ParseError> {
        self.subscription_url(
            &format!(
                "resourceGroups/{}/{}",
                resource_group,
                path.trim_start_matches('/')
            ),
            api_version,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArmClient {
        let config = ConnectionConfig {
            name: Some("acct1".to_string()),
            subscription_id: Some("sub-1".to_string()),
            ..Default::default()
        };
        ArmClient::new(&config, "token").unwrap()
    }

    #[test]
    fn test_subscription_url() {
        let url = client().subscription_url("resourcegroups", "2021-04-01").unwrap();
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/sub-1/resourcegroups?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_resource_group_url_with_base_override() {
        let url = client()
            .with_base_url("http://127.0.0.1:9999/")
            .resource_group_url("rg1", "providers/Microsoft.Compute/virtualMachines", "2023-03-01")
            .unwrap();
        assert_eq!(
            url,
            "http://127.0.0.1:9999/subscriptions/sub-1/resourceGroups/rg1/providers/Microsoft.Compute/virtualMachines?api-version=2023-03-01"
        );
    }

    #[test]
    fn test_call_tags() {
        let tags = client().call_tags("Microsoft.Resources", "resourceGroups/read");
        assert_eq!(tags.get("connection"), Some("acct1"));
        assert_eq!(tags.get("subscription"), Some("sub-1"));
        assert_eq!(tags.get("action"), Some("resourceGroups/read"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_draw_from_same_bucket() {
        let config = ConnectionConfig {
            name: Some("shared-bucket-conn".to_string()),
            subscription_id: Some("sub-shared".to_string()),
            ..Default::default()
        };
        let a = ArmClient::new(&config, "token-a").unwrap();
        let b = ArmClient::new(&config, "token-b").unwrap();
        assert!(Arc::ptr_eq(a.rate_limiter(), b.rate_limiter()));

        let burst = crate::ratelimit::get_registry()
            .get("azure_resources_group_read")
            .unwrap()
            .bucket_size as usize;
        let never = CancelSignal::never();
        let start = tokio::time::Instant::now();

        let tags = a.call_tags("Microsoft.Resources", "resourceGroups/read");
        for _ in 0..burst {
            a.rate_limiter().acquire(&tags, &never).await.unwrap();
        }
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);

        // a drained the bucket, so b has to wait for a refill
        let tags = b.call_tags("Microsoft.Resources", "resourceGroups/read");
        b.rate_limiter().acquire(&tags, &never).await.unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_millis(300));
    }
}
