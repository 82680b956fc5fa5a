//! Rate Limiter Registry - Load limiter definitions from JSON
//!
//! Limiter definitions are embedded at compile time, one file per service
//! family, and parsed once on first access.

use super::bucket::BucketKey;
use super::selector::{CallTags, Selector};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Embedded limiter JSON files (compiled into the binary)
const LIMITER_FILES: &[&str] = &[
    include_str!("../limiters/resources.json"),
    include_str!("../limiters/compute.json"),
    include_str!("../limiters/storage.json"),
    include_str!("../limiters/keyvault.json"),
    include_str!("../limiters/monitor.json"),
];

/// One named token-bucket rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimiterDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tokens added per second
    pub fill_rate: f64,
    /// Maximum tokens held, i.e. the allowed burst
    pub bucket_size: f64,
    /// Tag names whose values identify one bucket instance
    pub scope: Vec<String>,
    pub selector: Selector,
}

impl RateLimiterDefinition {
    pub fn matches(&self, tags: &CallTags) -> bool {
        self.selector.matches(tags)
    }

    /// Derive the bucket this call draws from
    pub fn bucket_key(&self, tags: &CallTags) -> BucketKey {
        BucketKey::derive(&self.name, &self.scope, tags)
    }
}

/// Root structure of limiters/*.json
#[derive(Debug, Clone, Default, Deserialize)]
struct LimiterConfig {
    #[serde(default)]
    limiters: Vec<RateLimiterDefinition>,
}

/// Read-only set of limiter definitions
#[derive(Debug, Clone, Default)]
pub struct RateLimiterRegistry {
    definitions: Vec<RateLimiterDefinition>,
}

impl RateLimiterRegistry {
    /// Build a registry, rejecting definitions the bucket engine cannot serve
    pub fn new(definitions: Vec<RateLimiterDefinition>) -> Result<Self> {
        let registry = Self { definitions };
        registry.validate()?;
        Ok(registry)
    }

    /// Parse and merge limiter JSON documents
    pub fn from_json_sources(sources: &[&str]) -> Result<Self> {
        let mut definitions = Vec::new();
        for content in sources {
            let partial: LimiterConfig = serde_json::from_str(content)?;
            definitions.extend(partial.limiters);
        }
        Self::new(definitions)
    }

    pub fn definitions(&self) -> &[RateLimiterDefinition] {
        &self.definitions
    }

    pub fn get(&self, name: &str) -> Option<&RateLimiterDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// All definitions whose selector accepts the call. Empty means ungated.
    pub fn matching(&self, tags: &CallTags) -> Vec<&RateLimiterDefinition> {
        self.definitions.iter().filter(|d| d.matches(tags)).collect()
    }

    /// Check the definitions are usable by the bucket engine.
    ///
    /// A bucket smaller than one token or a non-positive fill rate would
    /// leave callers waiting forever.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for def in &self.definitions {
            if !seen.insert(def.name.as_str()) {
                bail!("duplicate rate limiter name: {}", def.name);
            }
            if !(def.fill_rate > 0.0 && def.fill_rate.is_finite()) {
                bail!("rate limiter {} has invalid fill_rate {}", def.name, def.fill_rate);
            }
            if !(def.bucket_size >= 1.0 && def.bucket_size.is_finite()) {
                bail!(
                    "rate limiter {} has invalid bucket_size {}",
                    def.name,
                    def.bucket_size
                );
            }
            if def.scope.is_empty() {
                bail!("rate limiter {} has an empty scope", def.name);
            }
        }
        Ok(())
    }
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<RateLimiterRegistry> = OnceLock::new();

/// Get the built-in limiter registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static RateLimiterRegistry {
    REGISTRY.get_or_init(|| {
        RateLimiterRegistry::from_json_sources(LIMITER_FILES)
            .unwrap_or_else(|e| panic!("Invalid embedded limiter definitions: {}", e))
    })
}
