//! Configuration Management
//!
//! Connection-level settings: which subscription and cloud to talk to, how
//! hard to retry, and which resource groups are in scope.

use crate::retry::ConnectionRetryConfig;
use crate::scope::ResourceGroupFilterConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection name used when the config does not give one
const DEFAULT_CONNECTION_NAME: &str = "azure";

/// Azure cloud the connection targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudEnvironment {
    #[default]
    #[serde(rename = "AZUREPUBLICCLOUD", alias = "AzurePublicCloud")]
    Public,
    #[serde(rename = "AZURECHINACLOUD", alias = "AzureChinaCloud")]
    China,
    #[serde(rename = "AZUREUSGOVERNMENTCLOUD", alias = "AzureUSGovernmentCloud")]
    UsGovernment,
}

impl CloudEnvironment {
    /// Resource Manager endpoint for this cloud
    pub fn arm_endpoint(&self) -> &'static str {
        match self {
            CloudEnvironment::Public => "https://management.azure.com",
            CloudEnvironment::China => "https://management.chinacloudapi.cn",
            CloudEnvironment::UsGovernment => "https://management.usgovcloudapi.net",
        }
    }
}

/// User configuration for one connection
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectionConfig {
    /// Connection name, also the `connection` rate-limit dimension
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub environment: CloudEnvironment,
    /// Only takes effect above the default of 9
    #[serde(default)]
    pub max_error_retry_attempts: Option<i64>,
    /// Milliseconds; only takes effect above the default of 25
    #[serde(default)]
    pub min_error_retry_delay: Option<i64>,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub resource_groups: Vec<String>,
}

impl ConnectionConfig {
    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("azinv").join("connection.yaml"))
    }

    /// Load the default config file, falling back to defaults if it is absent
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load a config file; `.json` is parsed as JSON, anything else as YAML
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))
        }
    }

    pub fn connection_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_CONNECTION_NAME)
    }

    /// Get effective subscription (config > AZURE_SUBSCRIPTION_ID)
    pub fn effective_subscription(&self) -> Option<String> {
        self.subscription_id
            .clone()
            .or_else(|| std::env::var("AZURE_SUBSCRIPTION_ID").ok())
            .filter(|s| !s.trim().is_empty())
    }

    /// Retry settings; negative values are treated as unset
    pub fn retry_config(&self) -> ConnectionRetryConfig {
        ConnectionRetryConfig {
            max_error_retry_attempts: self
                .max_error_retry_attempts
                .and_then(|n| u32::try_from(n).ok()),
            min_error_retry_delay: self
                .min_error_retry_delay
                .and_then(|ms| u64::try_from(ms).ok())
                .map(Duration::from_millis),
        }
    }

    pub fn resource_group_filter(&self) -> ResourceGroupFilterConfig {
        ResourceGroupFilterConfig {
            resource_group: self.resource_group.clone(),
            resource_groups: self.resource_groups.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_connection() {
        let yaml = r#"
name: prod
subscription_id: 0000-1111
environment: AZUREUSGOVERNMENTCLOUD
max_error_retry_attempts: 12
min_error_retry_delay: 100
resource_groups:
  - "prod-*"
  - "stage-?"
"#;
        let config: ConnectionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.connection_name(), "prod");
        assert_eq!(config.environment, CloudEnvironment::UsGovernment);
        assert_eq!(
            config.environment.arm_endpoint(),
            "https://management.usgovcloudapi.net"
        );

        let retry = config.retry_config();
        assert_eq!(retry.max_error_retry_attempts, Some(12));
        assert_eq!(retry.min_error_retry_delay, Some(Duration::from_millis(100)));

        let filter = config.resource_group_filter();
        assert_eq!(filter.resource_groups, vec!["prod-*", "stage-?"]);
        assert_eq!(filter.resource_group, None);
    }

    #[test]
    fn test_defaults() {
        let config: ConnectionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.connection_name(), "azure");
        assert_eq!(config.environment, CloudEnvironment::Public);
        assert_eq!(config.retry_config(), ConnectionRetryConfig::default());
        assert_eq!(config.resource_group_filter(), ResourceGroupFilterConfig::default());
    }

    #[test]
    fn test_negative_retry_values_are_unset() {
        let config = ConnectionConfig {
            max_error_retry_attempts: Some(-1),
            min_error_retry_delay: Some(-5),
            ..Default::default()
        };
        assert_eq!(config.retry_config(), ConnectionRetryConfig::default());
    }

    #[test]
    fn test_load_from_json_file() {
        let path = std::env::temp_dir().join(format!("azinv-test-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"resource_group": "MyRG"}"#).unwrap();

        let config = ConnectionConfig::load_from(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.resource_group.as_deref(), Some("MyRG"));
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let path = std::env::temp_dir().join("azinv-definitely-missing.yaml");
        assert!(ConnectionConfig::load_from(&path).is_err());
    }
}
